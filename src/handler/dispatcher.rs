use std::sync::Arc;

use alloy_primitives::{Address, TxHash};
use bigdecimal::BigDecimal;
use tracing::{error, info};

use crate::{
    error::Error,
    helpers::to_smallest_unit,
    model::Confirmation,
    provider::LoanContractWriter,
};

/// Submits state changing contract calls and waits until each one is mined.
/// Each call names the account it is sent from.
///
/// Authorization and input checks belong to the caller. Rejections from the
/// contract runtime are returned unchanged and never retried. Callers are
/// expected to refresh the aggregator views after a successful write.
pub struct ActionDispatcher {
    contract: Arc<dyn LoanContractWriter>,
}

impl ActionDispatcher {
    pub fn new(contract: Arc<dyn LoanContractWriter>) -> Self {
        Self { contract }
    }

    pub async fn request_loan(
        &self,
        borrower: Address,
        amount: &BigDecimal,
        repayment_percent: u64,
    ) -> Result<Confirmation, Error> {
        let amount = to_smallest_unit(amount)?;
        let submitted = self
            .contract
            .request_loan(borrower, amount, repayment_percent)
            .await;

        self.confirm("requestLoan", submitted).await
    }

    pub async fn approve_loan(
        &self,
        owner: Address,
        borrower: Address,
    ) -> Result<Confirmation, Error> {
        let submitted = self.contract.approve_loan(owner, borrower).await;

        self.confirm("approveLoan", submitted).await
    }

    pub async fn repay_loan(
        &self,
        borrower: Address,
        income: &BigDecimal,
    ) -> Result<Confirmation, Error> {
        let income = to_smallest_unit(income)?;
        let submitted = self.contract.repay_loan(borrower, income).await;

        self.confirm("repayLoan", submitted).await
    }

    async fn confirm(
        &self,
        action: &str,
        submitted: Result<TxHash, Error>,
    ) -> Result<Confirmation, Error> {
        let transaction_hash = match submitted {
            Ok(hash) => hash,
            Err(e) => {
                error!("{} rejected: {}", action, e);
                return Err(e);
            },
        };

        match self.contract.wait_for_receipt(transaction_hash).await {
            Ok(confirmation) => {
                info!(
                    "{} confirmed, tx {} in block {}",
                    action,
                    confirmation.transaction_hash,
                    confirmation.block_number
                );
                Ok(confirmation)
            },
            Err(e) => {
                error!("{} failed, tx {}: {}", action, transaction_hash, e);
                Err(e)
            },
        }
    }
}
