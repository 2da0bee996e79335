use alloy_primitives::{Address, TxHash};
use bigdecimal::{BigDecimal, Zero as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    helpers::from_smallest_unit,
    types::{LifecycleKind, RawLoan},
};

// =============================================================================
// Loan Record
// =============================================================================

/// Current on-chain state of the single loan held by a borrower address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub borrower_address: Address,
    pub loan_amount: BigDecimal,
    pub repaid_amount: BigDecimal,
    pub repayment_percent: u64,
    pub is_approved: bool,
    pub is_completed: bool,
}

impl LoanRecord {
    pub fn from_raw(
        borrower_address: Address,
        raw: &RawLoan,
    ) -> Result<LoanRecord, Error> {
        let repayment_percent =
            u64::try_from(raw.repayment_percent).map_err(|_| {
                Error::AbiDecode(format!(
                    "repayment percent {} out of range",
                    raw.repayment_percent
                ))
            })?;

        Ok(LoanRecord {
            borrower_address,
            loan_amount: from_smallest_unit(raw.loan_amount),
            repaid_amount: from_smallest_unit(raw.repaid_amount),
            repayment_percent,
            is_approved: raw.is_approved,
            is_completed: raw.is_completed,
        })
    }

    /// A zero loan amount is how the contract reports "no loan".
    pub fn exists(&self) -> bool {
        !self.loan_amount.is_zero()
    }

    pub fn is_pending(&self) -> bool {
        !self.is_approved && !self.is_completed
    }

    pub fn is_active(&self) -> bool {
        self.is_approved && !self.is_completed
    }

    /// Completion without approval cannot happen on a well behaved contract.
    pub fn is_consistent(&self) -> bool {
        !self.is_completed || self.is_approved
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub record: LoanRecord,
    pub status_text: String,
}

// =============================================================================
// Events
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequestEvent {
    pub borrower_address: Address,
    pub loan_amount: BigDecimal,
    pub repayment_percent: u64,
    pub timestamp: DateTime<Utc>,
    pub source_transaction_id: TxHash,
    pub block_number: u64,
    pub log_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanActivity {
    pub kind: LifecycleKind,
    pub borrower_address: Address,
    pub amount: Option<BigDecimal>,
    pub total_repaid: Option<BigDecimal>,
    pub timestamp: DateTime<Utc>,
    pub source_transaction_id: TxHash,
    pub block_number: u64,
    pub log_index: u64,
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStatistics {
    pub total_requests: u64,
    pub pending_loans: u64,
    pub approved_loans: u64,
    pub completed_loans: u64,
    pub total_loan_amount: BigDecimal,
    pub total_repaid_amount: BigDecimal,
    /// Percentage with two decimal places, truncated.
    pub repayment_rate: BigDecimal,
}

impl PortfolioStatistics {
    /// Fallback reported whenever any read of a refresh fails. A partial
    /// aggregate is never returned.
    pub fn empty() -> PortfolioStatistics {
        PortfolioStatistics {
            total_requests: 0,
            pending_loans: 0,
            approved_loans: 0,
            completed_loans: 0,
            total_loan_amount: BigDecimal::zero(),
            total_repaid_amount: BigDecimal::zero(),
            repayment_rate: BigDecimal::zero(),
        }
    }
}

impl Default for PortfolioStatistics {
    fn default() -> Self {
        Self::empty()
    }
}

// =============================================================================
// Status and writes
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    pub connected: bool,
    pub block_number: Option<u64>,
    pub contract: Address,
    pub statistics: PortfolioStatistics,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub transaction_hash: TxHash,
    pub block_number: u64,
}
