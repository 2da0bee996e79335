use std::fmt;

use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

/// `loans(address)` return tuple, amounts in the contract's smallest unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLoan {
    pub loan_amount: U256,
    pub repaid_amount: U256,
    pub repayment_percent: U256,
    pub is_approved: bool,
    pub is_completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLoanRequested {
    pub borrower: Address,
    pub amount: U256,
    pub repayment_percent: U256,
    pub block_number: u64,
    pub transaction_hash: TxHash,
    pub log_index: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    Requested,
    Approved,
    Repaid,
    Completed,
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleKind::Requested => write!(f, "requested"),
            LifecycleKind::Approved => write!(f, "approved"),
            LifecycleKind::Repaid => write!(f, "repaid"),
            LifecycleKind::Completed => write!(f, "completed"),
        }
    }
}

/// `LoanApproved`, `LoanRepaid` or `LoanCompleted` log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLifecycleLog {
    pub kind: LifecycleKind,
    pub borrower: Address,
    //repaid and totalRepaid, only set for LoanRepaid
    pub repaid: Option<U256>,
    pub total_repaid: Option<U256>,
    pub block_number: u64,
    pub transaction_hash: TxHash,
    pub log_index: u64,
}
