//! In-memory loan contract and a scripted JSON-RPC node used by unit tests.

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use actix_web::{web, App, HttpResponse};
use alloy_primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use url::Url;

use crate::{
    configuration::{AppState, Config, State},
    error::Error,
    model::Confirmation,
    provider::{EvmLoanContract, LoanContractReader, LoanContractWriter},
    types::{LifecycleKind, RawLifecycleLog, RawLoan, RawLoanRequested},
};

/// One display unit in the contract's smallest unit.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

pub fn address(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub fn config() -> Config {
    Config {
        rpc_host: Url::parse("http://127.0.0.1:8545").unwrap(),
        loan_contract: address(200),
        from_block: 0,
        timeout: 0,
        receipt_poll_interval_ms: 10,
        max_tasks: 2,
        status_interval: 0,
        server_host: String::from("127.0.0.1"),
        port: 8080,
        allowed_origins: vec![String::from("*")],
        static_dir: None,
        auth: String::from("test-secret"),
    }
}

/// Service object backed by one fake for both reads and writes.
pub fn app_state(fake: Arc<FakeLoanContract>) -> AppState<State> {
    AppState::new(State::with_contract(config(), fake.clone(), fake))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Request {
        from: Address,
        amount: U256,
        repayment_percent: u64,
    },
    Approve {
        from: Address,
        borrower: Address,
    },
    Repay {
        from: Address,
        income: U256,
    },
}

#[derive(Debug, Default)]
pub struct FakeLoanContract {
    requests: Vec<RawLoanRequested>,
    lifecycle: Vec<RawLifecycleLog>,
    loans: HashMap<Address, RawLoan>,
    block_times: HashMap<u64, i64>,
    failing: HashSet<Address>,
    fail_logs: bool,
    fail_block_number: bool,
    owner: Option<Address>,
    reject_with: Option<String>,
    revert: bool,
    next_log_index: u64,
    block_lookups: AtomicUsize,
    submitted: Mutex<Vec<Submitted>>,
}

impl FakeLoanContract {
    pub fn with_request(
        mut self,
        borrower: Address,
        amount: u128,
        repayment_percent: u128,
        block_number: u64,
    ) -> Self {
        let log_index = self.next_log_index();
        self.requests.push(RawLoanRequested {
            borrower,
            amount: U256::from(amount),
            repayment_percent: U256::from(repayment_percent),
            block_number,
            transaction_hash: tx_hash(log_index),
            log_index,
        });
        self
    }

    pub fn with_lifecycle(
        mut self,
        borrower: Address,
        kind: LifecycleKind,
        repaid: Option<(u128, u128)>,
        block_number: u64,
    ) -> Self {
        let log_index = self.next_log_index();
        self.lifecycle.push(RawLifecycleLog {
            kind,
            borrower,
            repaid: repaid.map(|(repaid, _)| U256::from(repaid)),
            total_repaid: repaid.map(|(_, total)| U256::from(total)),
            block_number,
            transaction_hash: tx_hash(log_index),
            log_index,
        });
        self
    }

    pub fn with_loan(
        mut self,
        borrower: Address,
        loan_amount: u128,
        repaid_amount: u128,
        repayment_percent: u128,
        is_approved: bool,
        is_completed: bool,
    ) -> Self {
        self.with_raw_loan(
            borrower,
            RawLoan {
                loan_amount: U256::from(loan_amount),
                repaid_amount: U256::from(repaid_amount),
                repayment_percent: U256::from(repayment_percent),
                is_approved,
                is_completed,
            },
        )
    }

    pub fn with_raw_loan(mut self, borrower: Address, loan: RawLoan) -> Self {
        self.loans.insert(borrower, loan);
        self
    }

    /// Request event plus matching live record.
    pub fn with_requested_loan(
        self,
        borrower: Address,
        loan_amount: u128,
        repaid_amount: u128,
        is_approved: bool,
        is_completed: bool,
        block_number: u64,
    ) -> Self {
        self.with_request(borrower, loan_amount, 10, block_number)
            .with_loan(
                borrower,
                loan_amount,
                repaid_amount,
                10,
                is_approved,
                is_completed,
            )
    }

    pub fn with_block_time(mut self, block_number: u64, seconds: i64) -> Self {
        self.block_times.insert(block_number, seconds);
        self
    }

    pub fn with_owner(mut self, owner: Address) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn failing_address(mut self, borrower: Address) -> Self {
        self.failing.insert(borrower);
        self
    }

    pub fn failing_logs(mut self) -> Self {
        self.fail_logs = true;
        self
    }

    pub fn failing_block_number(mut self) -> Self {
        self.fail_block_number = true;
        self
    }

    pub fn rejecting(mut self, message: &str) -> Self {
        self.reject_with = Some(message.to_owned());
        self
    }

    pub fn reverting(mut self) -> Self {
        self.revert = true;
        self
    }

    pub fn block_lookups(&self) -> usize {
        self.block_lookups.load(Ordering::SeqCst)
    }

    pub fn submitted(&self) -> Vec<Submitted> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn next_log_index(&mut self) -> u64 {
        let index = self.next_log_index;
        self.next_log_index += 1;
        index
    }

    fn submit(&self, call: Submitted) -> Result<TxHash, Error> {
        if let Some(message) = &self.reject_with {
            return Err(Error::WriteRejected(message.to_owned()));
        }

        let mut submitted = self
            .submitted
            .lock()
            .map_err(|e| Error::ServerError(e.to_string()))?;
        submitted.push(call);

        Ok(tx_hash(100 + submitted.len() as u64))
    }
}

fn tx_hash(n: u64) -> TxHash {
    B256::left_padding_from(&n.to_be_bytes())
}

fn unavailable() -> Error {
    Error::Rpc {
        code: -32000,
        message: String::from("node unavailable"),
    }
}

#[async_trait]
impl LoanContractReader for FakeLoanContract {
    async fn loans(&self, borrower: Address) -> Result<RawLoan, Error> {
        if self.failing.contains(&borrower) {
            return Err(unavailable());
        }

        Ok(self.loans.get(&borrower).cloned().unwrap_or_default())
    }

    async fn check_loan_status(
        &self,
        borrower: Address,
    ) -> Result<String, Error> {
        let loan = self.loans(borrower).await?;

        let status = if loan.loan_amount.is_zero() {
            "No loan"
        } else if loan.is_completed {
            "Loan completed"
        } else if loan.is_approved {
            "Loan approved"
        } else {
            "Loan pending approval"
        };

        Ok(status.to_owned())
    }

    async fn owner(&self) -> Result<Address, Error> {
        self.owner.ok_or_else(unavailable)
    }

    async fn loan_requested_logs(&self) -> Result<Vec<RawLoanRequested>, Error> {
        if self.fail_logs {
            return Err(unavailable());
        }

        Ok(self.requests.clone())
    }

    async fn lifecycle_logs(&self) -> Result<Vec<RawLifecycleLog>, Error> {
        if self.fail_logs {
            return Err(unavailable());
        }

        Ok(self.lifecycle.clone())
    }

    async fn block_timestamp(
        &self,
        block_number: u64,
    ) -> Result<DateTime<Utc>, Error> {
        self.block_lookups.fetch_add(1, Ordering::SeqCst);

        let seconds = self
            .block_times
            .get(&block_number)
            .copied()
            .unwrap_or(1_700_000_000 + block_number as i64 * 12);

        DateTime::from_timestamp(seconds, 0).ok_or_else(unavailable)
    }

    async fn block_number(&self) -> Result<u64, Error> {
        if self.fail_block_number {
            return Err(unavailable());
        }

        Ok(self
            .requests
            .iter()
            .map(|log| log.block_number)
            .chain(self.lifecycle.iter().map(|log| log.block_number))
            .max()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LoanContractWriter for FakeLoanContract {
    async fn request_loan(
        &self,
        borrower: Address,
        amount: U256,
        repayment_percent: u64,
    ) -> Result<TxHash, Error> {
        self.submit(Submitted::Request {
            from: borrower,
            amount,
            repayment_percent,
        })
    }

    async fn approve_loan(
        &self,
        owner: Address,
        borrower: Address,
    ) -> Result<TxHash, Error> {
        self.submit(Submitted::Approve {
            from: owner,
            borrower,
        })
    }

    async fn repay_loan(
        &self,
        borrower: Address,
        income: U256,
    ) -> Result<TxHash, Error> {
        self.submit(Submitted::Repay {
            from: borrower,
            income,
        })
    }

    async fn wait_for_receipt(
        &self,
        transaction_hash: TxHash,
    ) -> Result<Confirmation, Error> {
        if self.revert {
            return Err(Error::WriteRejected(format!(
                "transaction {} reverted",
                transaction_hash
            )));
        }

        Ok(Confirmation {
            transaction_hash,
            block_number: 42,
        })
    }
}

/// JSON-RPC node answering from per method scripts. Each call takes the next
/// scripted reply and the last one repeats. Unscripted methods get a
/// "method not found" error.
#[derive(Debug, Default)]
pub struct StubNode {
    scripted: Mutex<HashMap<String, VecDeque<Value>>>,
    calls: Mutex<Vec<(String, Value)>>,
    unavailable: bool,
}

impl StubNode {
    /// `reply` holds the `result` or `error` member of the response.
    pub fn respond(self, method: &str, reply: Value) -> Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(method.to_owned())
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request is answered with HTTP 503.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    pub fn start(self) -> RunningNode {
        let node = web::Data::new(self);
        let data = node.clone();
        let server = actix_test::start(move || {
            App::new()
                .app_data(data.clone())
                .route("/", web::post().to(rpc))
        });

        RunningNode { node, server }
    }

    fn reply(&self, method: &str) -> Value {
        let mut scripted = self.scripted.lock().unwrap();

        match scripted.get_mut(method) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap(),
            None => json!({
                "error": { "code": -32601, "message": "method not found" }
            }),
        }
    }
}

async fn rpc(node: web::Data<StubNode>, body: web::Json<Value>) -> HttpResponse {
    if node.unavailable {
        return HttpResponse::ServiceUnavailable().finish();
    }

    let method = body["method"].as_str().unwrap_or_default().to_owned();
    node.calls
        .lock()
        .unwrap()
        .push((method.clone(), body["params"].clone()));

    let mut response = json!({ "jsonrpc": "2.0", "id": body["id"].clone() });
    if let (Some(response), Value::Object(reply)) =
        (response.as_object_mut(), node.reply(&method))
    {
        response.extend(reply);
    }

    HttpResponse::Ok().json(response)
}

pub struct RunningNode {
    node: web::Data<StubNode>,
    server: actix_test::TestServer,
}

impl RunningNode {
    /// Production client pointed at this node.
    pub fn contract(&self) -> EvmLoanContract {
        let mut config = config();
        config.rpc_host = Url::parse(&self.server.url("/")).unwrap();
        EvmLoanContract::new(&config).unwrap()
    }

    /// Params of every call to `method`, in arrival order.
    pub fn params(&self, method: &str) -> Vec<Value> {
        self.node
            .calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == method)
            .map(|(_, params)| params.clone())
            .collect()
    }
}
