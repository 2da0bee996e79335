use alloy_primitives::{Address, Bytes, TxHash, B256, U64};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: U64,
    pub transaction_hash: TxHash,
    pub log_index: U64,
    #[serde(default)]
    pub removed: bool,
}
