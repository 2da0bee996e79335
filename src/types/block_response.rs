use alloy_primitives::U64;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct BlockHeader {
    pub number: U64,
    pub timestamp: U64,
}
