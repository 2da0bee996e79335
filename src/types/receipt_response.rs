use alloy_primitives::{TxHash, U64};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<U64>,
    //pre-byzantium receipts carry `root` instead
    pub status: Option<U64>,
}
