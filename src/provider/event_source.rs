use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::error;

use crate::{
    error::Error,
    helpers::from_smallest_unit,
    model::{LoanActivity, LoanDetails, LoanRecord, LoanRequestEvent},
    types::{LifecycleKind, RawLoanRequested},
};

use super::contract::LoanContractReader;

/// Translates the contract's event log and view functions into loan read
/// models. Every call performs a fresh full scan; nothing is cached.
#[derive(Clone)]
pub struct EventSource {
    contract: Arc<dyn LoanContractReader>,
}

impl EventSource {
    pub fn new(contract: Arc<dyn LoanContractReader>) -> Self {
        Self { contract }
    }

    /// All loan requests, newest first. Transport failures yield an empty
    /// list.
    pub async fn fetch_request_events(&self) -> Vec<LoanRequestEvent> {
        match self.try_fetch_request_events().await {
            Ok(events) => events,
            Err(e) => {
                error!("Could not fetch loan request events: {}", e);
                vec![]
            },
        }
    }

    pub async fn fetch_loan_record(
        &self,
        borrower: Address,
    ) -> Result<LoanRecord, Error> {
        let raw = self.contract.loans(borrower).await?;
        LoanRecord::from_raw(borrower, &raw)
    }

    pub async fn fetch_loan_details(
        &self,
        borrower: Address,
    ) -> Result<LoanDetails, Error> {
        let (raw, status_text) = tokio::try_join!(
            self.contract.loans(borrower),
            self.contract.check_loan_status(borrower)
        )?;

        Ok(LoanDetails {
            record: LoanRecord::from_raw(borrower, &raw)?,
            status_text,
        })
    }

    /// Every lifecycle event of every loan, newest first. Transport failures
    /// yield an empty list.
    pub async fn fetch_activity(&self) -> Vec<LoanActivity> {
        match self.try_fetch_activity().await {
            Ok(activity) => activity,
            Err(e) => {
                error!("Could not fetch loan activity: {}", e);
                vec![]
            },
        }
    }

    pub async fn fetch_owner(&self) -> Result<Address, Error> {
        self.contract.owner().await
    }

    pub async fn latest_block(&self) -> Result<u64, Error> {
        self.contract.block_number().await
    }

    async fn try_fetch_request_events(
        &self,
    ) -> Result<Vec<LoanRequestEvent>, Error> {
        let logs = self.contract.loan_requested_logs().await?;
        let timestamps =
            self.block_timestamps(logs.iter().map(|log| log.block_number))
                .await?;

        let mut events = logs
            .into_iter()
            .map(|log| {
                let timestamp = lookup(&timestamps, log.block_number)?;
                request_event(log, timestamp)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        events.sort_by(|a, b| {
            (b.timestamp, b.block_number, b.log_index).cmp(&(
                a.timestamp,
                a.block_number,
                a.log_index,
            ))
        });

        Ok(events)
    }

    async fn try_fetch_activity(&self) -> Result<Vec<LoanActivity>, Error> {
        let (requests, lifecycle) = tokio::try_join!(
            self.contract.loan_requested_logs(),
            self.contract.lifecycle_logs()
        )?;

        let blocks = requests
            .iter()
            .map(|log| log.block_number)
            .chain(lifecycle.iter().map(|log| log.block_number));
        let timestamps = self.block_timestamps(blocks).await?;

        let mut activity = Vec::with_capacity(requests.len() + lifecycle.len());

        for log in requests {
            activity.push(LoanActivity {
                kind: LifecycleKind::Requested,
                borrower_address: log.borrower,
                amount: Some(from_smallest_unit(log.amount)),
                total_repaid: None,
                timestamp: lookup(&timestamps, log.block_number)?,
                source_transaction_id: log.transaction_hash,
                block_number: log.block_number,
                log_index: log.log_index,
            });
        }

        for log in lifecycle {
            activity.push(LoanActivity {
                kind: log.kind,
                borrower_address: log.borrower,
                amount: log.repaid.map(from_smallest_unit),
                total_repaid: log.total_repaid.map(from_smallest_unit),
                timestamp: lookup(&timestamps, log.block_number)?,
                source_transaction_id: log.transaction_hash,
                block_number: log.block_number,
                log_index: log.log_index,
            });
        }

        activity.sort_by(|a, b| {
            (b.timestamp, b.block_number, b.log_index).cmp(&(
                a.timestamp,
                a.block_number,
                a.log_index,
            ))
        });

        Ok(activity)
    }

    /// Resolves each distinct block once.
    async fn block_timestamps(
        &self,
        blocks: impl Iterator<Item = u64>,
    ) -> Result<HashMap<u64, DateTime<Utc>>, Error> {
        let unique: BTreeSet<u64> = blocks.collect();

        let resolved = try_join_all(unique.into_iter().map(|block| async move {
            let timestamp = self.contract.block_timestamp(block).await?;
            Ok::<_, Error>((block, timestamp))
        }))
        .await?;

        Ok(resolved.into_iter().collect())
    }
}

fn lookup(
    timestamps: &HashMap<u64, DateTime<Utc>>,
    block_number: u64,
) -> Result<DateTime<Utc>, Error> {
    timestamps.get(&block_number).copied().ok_or_else(|| {
        Error::EmptyRpcResult(format!("timestamp of block {}", block_number))
    })
}

fn request_event(
    log: RawLoanRequested,
    timestamp: DateTime<Utc>,
) -> Result<LoanRequestEvent, Error> {
    let repayment_percent =
        u64::try_from(log.repayment_percent).map_err(|_| {
            Error::AbiDecode(format!(
                "repayment percent {} out of range",
                log.repayment_percent
            ))
        })?;

    Ok(LoanRequestEvent {
        borrower_address: log.borrower,
        loan_amount: from_smallest_unit(log.amount),
        repayment_percent,
        timestamp,
        source_transaction_id: log.transaction_hash,
        block_number: log.block_number,
        log_index: log.log_index,
    })
}
