pub use self::{
    block_response::BlockHeader,
    loan_contract_type::{
        LifecycleKind, RawLifecycleLog, RawLoan, RawLoanRequested,
    },
    log_response::LogEntry,
    receipt_response::TransactionReceipt,
    rpc_response::{RpcBody, RpcErrorBody},
};

mod block_response;
mod loan_contract_type;
mod log_response;
mod receipt_response;
mod rpc_response;
