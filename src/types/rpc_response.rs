use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct RpcBody<T> {
    pub jsonrpc: String,
    pub id: u64,
    pub result: Option<T>,
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}
