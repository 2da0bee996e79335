pub use self::{
    contract::{EvmLoanContract, LoanContractReader, LoanContractWriter},
    event_source::EventSource,
    rpc::JsonRpc,
};

pub mod abi;
mod contract;
mod event_source;
mod rpc;
