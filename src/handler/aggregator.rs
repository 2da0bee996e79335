use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use chrono::Utc;
use tokio::task::JoinSet;
use tracing::{error, warn};

use crate::{
    error::Error,
    model::{
        LoanActivity, LoanDetails, LoanRecord, LoanRequestEvent,
        PortfolioStatistics, SystemStatus,
    },
    provider::EventSource,
};

use super::statistics::compute_statistics;

/// Derived loan views built from the request event log plus one live read
/// per distinct borrower.
///
/// Each call is an independent refresh: one full event scan followed by
/// concurrent record reads (at most `max_tasks` in flight). Nothing is
/// shared between calls, so two concurrent callers may see different
/// snapshots.
///
/// The contract keeps a single record per address, so several requests
/// from one borrower collapse onto that record. Views report the most
/// recent request of each borrower.
pub struct LoanAggregator {
    source: EventSource,
    max_tasks: usize,
}

impl LoanAggregator {
    pub fn new(source: EventSource, max_tasks: usize) -> Self {
        Self {
            source,
            max_tasks: max_tasks.max(1),
        }
    }

    /// Every request event, newest first.
    pub async fn get_all_requests(&self) -> Vec<LoanRequestEvent> {
        self.source.fetch_request_events().await
    }

    /// Requests whose loan exists and is neither approved nor completed.
    /// Empty when any record read fails.
    pub async fn get_pending_requests(&self) -> Vec<LoanRequestEvent> {
        let requests = latest_per_borrower(self.get_all_requests().await);

        let records = match self.fetch_records(&borrowers(&requests)).await {
            Ok(records) => records,
            Err(e) => {
                error!("Could not build pending loan requests: {}", e);
                return vec![];
            },
        };

        requests
            .into_iter()
            .filter(|request| {
                records
                    .get(&request.borrower_address)
                    .is_some_and(|record| visible(record) && record.is_pending())
            })
            .collect()
    }

    /// Approved loans, completed ones included. Empty when any record read
    /// fails.
    pub async fn get_approved_loans(&self) -> Vec<LoanRecord> {
        let requests = latest_per_borrower(self.get_all_requests().await);
        let borrowers = borrowers(&requests);

        let mut records = match self.fetch_records(&borrowers).await {
            Ok(records) => records,
            Err(e) => {
                error!("Could not build approved loans: {}", e);
                return vec![];
            },
        };

        borrowers
            .iter()
            .filter_map(|borrower| records.remove(borrower))
            .filter(|record| visible(record) && record.is_approved)
            .collect()
    }

    /// Portfolio totals over each borrower's live record, or
    /// [`PortfolioStatistics::empty`] when any record read fails. Records
    /// without a loan and records completed without approval are left out
    /// of every count and total.
    pub async fn get_statistics(&self) -> PortfolioStatistics {
        let requests = latest_per_borrower(self.get_all_requests().await);

        match self.fetch_records(&borrowers(&requests)).await {
            Ok(records) => {
                compute_statistics(records.values().filter(|record| visible(record)))
            },
            Err(e) => {
                error!("Could not calculate loan statistics: {}", e);
                PortfolioStatistics::empty()
            },
        }
    }

    pub async fn get_loan_details(
        &self,
        borrower: Address,
    ) -> Result<LoanDetails, Error> {
        self.source.fetch_loan_details(borrower).await
    }

    pub async fn get_activity(&self) -> Vec<LoanActivity> {
        self.source.fetch_activity().await
    }

    /// Read failures answer `false`.
    pub async fn is_contract_owner(&self, address: Address) -> bool {
        match self.source.fetch_owner().await {
            Ok(owner) => owner == address,
            Err(e) => {
                error!("Could not read contract owner: {}", e);
                false
            },
        }
    }

    pub async fn get_system_status(&self, contract: Address) -> SystemStatus {
        let (block_number, statistics) =
            tokio::join!(self.source.latest_block(), self.get_statistics());

        let block_number = match block_number {
            Ok(block_number) => Some(block_number),
            Err(e) => {
                error!("Contract runtime unreachable: {}", e);
                None
            },
        };

        SystemStatus {
            connected: block_number.is_some(),
            block_number,
            contract,
            statistics,
            checked_at: Utc::now(),
        }
    }

    async fn fetch_records(
        &self,
        borrowers: &[Address],
    ) -> Result<HashMap<Address, LoanRecord>, Error> {
        let mut tasks = vec![];
        let mut records = HashMap::with_capacity(borrowers.len());

        for borrower in borrowers.iter().copied() {
            let source = self.source.clone();
            tasks.push(async move { source.fetch_loan_record(borrower).await });
        }

        while !tasks.is_empty() {
            let mut st = JoinSet::new();
            let range = tasks.len().min(self.max_tasks);

            for _t in 0..range {
                if let Some(item) = tasks.pop() {
                    st.spawn(item);
                }
            }

            while let Some(item) = st.join_next().await {
                let record = item??;
                records.insert(record.borrower_address, record);
            }
        }

        Ok(records)
    }
}

/// Keeps the first, i.e. most recent, request of each borrower.
fn latest_per_borrower(
    requests: Vec<LoanRequestEvent>,
) -> Vec<LoanRequestEvent> {
    let mut seen = HashSet::new();

    requests
        .into_iter()
        .filter(|request| seen.insert(request.borrower_address))
        .collect()
}

fn borrowers(requests: &[LoanRequestEvent]) -> Vec<Address> {
    requests
        .iter()
        .map(|request| request.borrower_address)
        .collect()
}

fn visible(record: &LoanRecord) -> bool {
    if !record.is_consistent() {
        warn!(
            "Skipping loan of {}: completed without approval",
            record.borrower_address
        );
        return false;
    }

    record.exists()
}
