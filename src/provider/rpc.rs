use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::{configuration::Config, error::Error, types::RpcBody};

/// JSON-RPC 2.0 transport to the chain node. The HTTP client keeps its
/// connection pool for the lifetime of the process.
#[derive(Debug)]
pub struct JsonRpc {
    url: Url,
    id: AtomicU64,
    pub http: Client,
}

impl JsonRpc {
    pub fn new(config: &Config) -> Result<JsonRpc, Error> {
        let mut builder = Client::builder();

        if config.timeout > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout));
        }

        let http = builder.build()?;

        Ok(JsonRpc {
            url: config.rpc_host.clone(),
            id: AtomicU64::new(1),
            http,
        })
    }

    /// Returns `Ok(None)` for a `null` result, which nodes use for unknown
    /// blocks and receipts of pending transactions.
    pub async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, Error> {
        let id = self.id.fetch_add(1, Ordering::Relaxed);
        debug!("rpc {} #{}", method, id);

        let body = self
            .http
            .post(self.url.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "method": method,
                "params": params,
                "id": id,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<RpcBody<T>>()
            .await?;

        if let Some(error) = body.error {
            return Err(Error::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(body.result)
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, Error> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| Error::EmptyRpcResult(method.to_owned()))
    }
}
