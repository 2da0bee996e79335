use std::time::Duration;

use alloy_primitives::{Address, Bytes, TxHash, B256, U256, U64};
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    configuration::Config,
    error::Error,
    model::Confirmation,
    types::{
        BlockHeader, LifecycleKind, LogEntry, RawLifecycleLog, RawLoan,
        RawLoanRequested, TransactionReceipt,
    },
};

use super::{abi::IMicroLoan, rpc::JsonRpc};

/// Read side of the loan contract, one method per contract view or event
/// query. Amounts are returned in the contract's smallest unit.
#[async_trait]
pub trait LoanContractReader: Send + Sync {
    async fn loans(&self, borrower: Address) -> Result<RawLoan, Error>;

    async fn check_loan_status(&self, borrower: Address)
        -> Result<String, Error>;

    async fn owner(&self) -> Result<Address, Error>;

    /// Full scan of `LoanRequested`, in log order.
    async fn loan_requested_logs(&self) -> Result<Vec<RawLoanRequested>, Error>;

    /// Full scan of `LoanApproved`, `LoanRepaid` and `LoanCompleted`.
    async fn lifecycle_logs(&self) -> Result<Vec<RawLifecycleLog>, Error>;

    async fn block_timestamp(
        &self,
        block_number: u64,
    ) -> Result<DateTime<Utc>, Error>;

    async fn block_number(&self) -> Result<u64, Error>;
}

/// Write side of the loan contract. Every call is sent from the account
/// that acts on chain: the borrower for requests and repayments, the owner
/// for approvals. Submissions return as soon as the node accepted the
/// transaction; `wait_for_receipt` blocks until it is mined.
#[async_trait]
pub trait LoanContractWriter: Send + Sync {
    async fn request_loan(
        &self,
        borrower: Address,
        amount: U256,
        repayment_percent: u64,
    ) -> Result<TxHash, Error>;

    async fn approve_loan(
        &self,
        owner: Address,
        borrower: Address,
    ) -> Result<TxHash, Error>;

    async fn repay_loan(
        &self,
        borrower: Address,
        income: U256,
    ) -> Result<TxHash, Error>;

    async fn wait_for_receipt(
        &self,
        transaction_hash: TxHash,
    ) -> Result<Confirmation, Error>;
}

#[derive(Debug)]
pub struct EvmLoanContract {
    rpc: JsonRpc,
    contract: Address,
    from_block: u64,
    poll_interval: Duration,
}

impl EvmLoanContract {
    pub fn new(config: &Config) -> Result<EvmLoanContract, Error> {
        let rpc = JsonRpc::new(config)?;

        Ok(EvmLoanContract {
            rpc,
            contract: config.loan_contract,
            from_block: config.from_block,
            poll_interval: Duration::from_millis(
                config.receipt_poll_interval_ms,
            ),
        })
    }

    async fn eth_call<C: SolCall>(&self, call: C) -> Result<Bytes, Error> {
        let data = Bytes::from(call.abi_encode());

        self.rpc
            .call(
                "eth_call",
                json!([{ "to": self.contract, "data": data }, "latest"]),
            )
            .await
    }

    async fn get_logs(&self, topics: Vec<B256>) -> Result<Vec<LogEntry>, Error> {
        let logs: Vec<LogEntry> = self
            .rpc
            .call(
                "eth_getLogs",
                json!([{
                    "address": self.contract,
                    "fromBlock": U64::from(self.from_block),
                    "toBlock": "latest",
                    "topics": [topics],
                }]),
            )
            .await?;

        Ok(logs.into_iter().filter(|log| !log.removed).collect())
    }

    /// Signing stays with the node, so `from` must be one of its accounts.
    async fn send_transaction<C: SolCall>(
        &self,
        from: Address,
        call: C,
    ) -> Result<TxHash, Error> {
        let accounts: Vec<Address> =
            self.rpc.call("eth_accounts", json!([])).await?;

        if !accounts.contains(&from) {
            return Err(Error::UnmanagedAccount(from.to_string()));
        }

        let data = Bytes::from(call.abi_encode());
        let result = self
            .rpc
            .call::<TxHash>(
                "eth_sendTransaction",
                json!([{ "from": from, "to": self.contract, "data": data }]),
            )
            .await;

        match result {
            Ok(hash) => {
                info!("submitted {} from {}, tx {}", C::SIGNATURE, from, hash);
                Ok(hash)
            },
            Err(Error::Rpc { message, .. }) => {
                Err(Error::WriteRejected(message))
            },
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl LoanContractReader for EvmLoanContract {
    async fn loans(&self, borrower: Address) -> Result<RawLoan, Error> {
        let data = self.eth_call(IMicroLoan::loansCall { borrower }).await?;
        let loan = IMicroLoan::loansCall::abi_decode_returns(&data)?;

        Ok(RawLoan {
            loan_amount: loan.loanAmount,
            repaid_amount: loan.repaidAmount,
            repayment_percent: loan.repaymentPercent,
            is_approved: loan.isApproved,
            is_completed: loan.isCompleted,
        })
    }

    async fn check_loan_status(
        &self,
        borrower: Address,
    ) -> Result<String, Error> {
        let data = self
            .eth_call(IMicroLoan::checkLoanStatusCall { borrower })
            .await?;

        Ok(IMicroLoan::checkLoanStatusCall::abi_decode_returns(&data)?)
    }

    async fn owner(&self) -> Result<Address, Error> {
        let data = self.eth_call(IMicroLoan::ownerCall {}).await?;

        Ok(IMicroLoan::ownerCall::abi_decode_returns(&data)?)
    }

    async fn loan_requested_logs(&self) -> Result<Vec<RawLoanRequested>, Error> {
        let logs = self
            .get_logs(vec![IMicroLoan::LoanRequested::SIGNATURE_HASH])
            .await?;
        debug!("fetched {} LoanRequested logs", logs.len());

        logs.iter().map(decode_loan_requested).collect()
    }

    async fn lifecycle_logs(&self) -> Result<Vec<RawLifecycleLog>, Error> {
        let logs = self
            .get_logs(vec![
                IMicroLoan::LoanApproved::SIGNATURE_HASH,
                IMicroLoan::LoanRepaid::SIGNATURE_HASH,
                IMicroLoan::LoanCompleted::SIGNATURE_HASH,
            ])
            .await?;

        logs.iter().map(decode_lifecycle).collect()
    }

    async fn block_timestamp(
        &self,
        block_number: u64,
    ) -> Result<DateTime<Utc>, Error> {
        let block: BlockHeader = self
            .rpc
            .call(
                "eth_getBlockByNumber",
                json!([U64::from(block_number), false]),
            )
            .await?;

        let seconds = block.timestamp.to::<u64>();
        let seconds = i64::try_from(seconds).map_err(|_| {
            Error::AbiDecode(format!("block timestamp {} out of range", seconds))
        })?;

        DateTime::from_timestamp(seconds, 0).ok_or_else(|| {
            Error::AbiDecode(format!("block timestamp {} out of range", seconds))
        })
    }

    async fn block_number(&self) -> Result<u64, Error> {
        let number: U64 = self.rpc.call("eth_blockNumber", json!([])).await?;
        Ok(number.to::<u64>())
    }
}

#[async_trait]
impl LoanContractWriter for EvmLoanContract {
    async fn request_loan(
        &self,
        borrower: Address,
        amount: U256,
        repayment_percent: u64,
    ) -> Result<TxHash, Error> {
        self.send_transaction(
            borrower,
            IMicroLoan::requestLoanCall {
                loanAmount: amount,
                repaymentPercent: U256::from(repayment_percent),
            },
        )
        .await
    }

    async fn approve_loan(
        &self,
        owner: Address,
        borrower: Address,
    ) -> Result<TxHash, Error> {
        self.send_transaction(owner, IMicroLoan::approveLoanCall { borrower })
            .await
    }

    async fn repay_loan(
        &self,
        borrower: Address,
        income: U256,
    ) -> Result<TxHash, Error> {
        self.send_transaction(borrower, IMicroLoan::repayLoanCall { income })
            .await
    }

    async fn wait_for_receipt(
        &self,
        transaction_hash: TxHash,
    ) -> Result<Confirmation, Error> {
        loop {
            let receipt = self
                .rpc
                .call_optional::<TransactionReceipt>(
                    "eth_getTransactionReceipt",
                    json!([transaction_hash]),
                )
                .await?;

            if let Some(receipt) = receipt {
                if let Some(block_number) = receipt.block_number {
                    return confirm(
                        receipt.transaction_hash,
                        block_number,
                        receipt.status,
                    );
                }
            }

            sleep(self.poll_interval).await;
        }
    }
}

fn confirm(
    transaction_hash: TxHash,
    block_number: U64,
    status: Option<U64>,
) -> Result<Confirmation, Error> {
    match status {
        Some(status) if status == U64::ZERO => {
            warn!("transaction {} reverted", transaction_hash);
            Err(Error::WriteRejected(format!(
                "transaction {} reverted",
                transaction_hash
            )))
        },
        _ => Ok(Confirmation {
            transaction_hash,
            block_number: block_number.to::<u64>(),
        }),
    }
}

fn decode_loan_requested(log: &LogEntry) -> Result<RawLoanRequested, Error> {
    let event = IMicroLoan::LoanRequested::decode_raw_log(
        log.topics.iter().copied(),
        &log.data,
    )?;

    Ok(RawLoanRequested {
        borrower: event.borrower,
        amount: event.amount,
        repayment_percent: event.repaymentPercent,
        block_number: log.block_number.to::<u64>(),
        transaction_hash: log.transaction_hash,
        log_index: log.log_index.to::<u64>(),
    })
}

fn decode_lifecycle(log: &LogEntry) -> Result<RawLifecycleLog, Error> {
    let topic = log.topics.first().ok_or_else(|| {
        Error::AbiDecode(format!("log {} has no topics", log.transaction_hash))
    })?;
    let topics = log.topics.iter().copied();

    let (kind, borrower, repaid, total_repaid) =
        if *topic == IMicroLoan::LoanApproved::SIGNATURE_HASH {
            let event =
                IMicroLoan::LoanApproved::decode_raw_log(topics, &log.data)?;
            (LifecycleKind::Approved, event.borrower, None, None)
        } else if *topic == IMicroLoan::LoanRepaid::SIGNATURE_HASH {
            let event =
                IMicroLoan::LoanRepaid::decode_raw_log(topics, &log.data)?;
            (
                LifecycleKind::Repaid,
                event.borrower,
                Some(event.repaid),
                Some(event.totalRepaid),
            )
        } else if *topic == IMicroLoan::LoanCompleted::SIGNATURE_HASH {
            let event =
                IMicroLoan::LoanCompleted::decode_raw_log(topics, &log.data)?;
            (LifecycleKind::Completed, event.borrower, None, None)
        } else {
            return Err(Error::AbiDecode(format!(
                "unexpected event topic {}",
                topic
            )));
        };

    Ok(RawLifecycleLog {
        kind,
        borrower,
        repaid,
        total_repaid,
        block_number: log.block_number.to::<u64>(),
        transaction_hash: log.transaction_hash,
        log_index: log.log_index.to::<u64>(),
    })
}
