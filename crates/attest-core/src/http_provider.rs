//! JSON-RPC log provider.
//!
//! Talks to any Ethereum node through `eth_blockNumber` and `eth_getLogs`.
//! Node error objects surface as [`ProviderError::Rpc`]; transport failures
//! and timeouts as [`ProviderError::Http`].

#![cfg(feature = "http-provider")]

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::trace;

use crate::errors::ProviderError;
use crate::provider::{parse_quantity, LogEntry, LogFilter, LogProvider};

/// JSON-RPC 2.0 log provider over HTTP(S).
pub struct JsonRpcProvider {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcProvider {
    pub fn new(url: impl Into<String>) -> Result<Self, ProviderError> {
        Self::with_timeout(url, Duration::from_secs(30))
    }

    /// Per-request timeout; the scanner applies its own whole-scan deadline.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        trace!(method, id, "rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.ok();
            return Err(ProviderError::BadResponse(format!("status={status} body={body:?}")));
        }

        let mut reply: Value = resp
            .json()
            .await
            .map_err(|e| ProviderError::BadResponse(format!("invalid JSON: {e}")))?;

        if let Some(error) = reply.get("error") {
            return Err(ProviderError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown RPC error")
                    .to_string(),
            });
        }

        match reply.get_mut("result") {
            Some(result) => Ok(result.take()),
            None => Err(ProviderError::BadResponse(
                "response missing 'result' field".to_string(),
            )),
        }
    }
}

#[async_trait]
impl LogProvider for JsonRpcProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let text = result
            .as_str()
            .ok_or_else(|| {
                ProviderError::BadResponse(format!("eth_blockNumber returned {result}"))
            })?;
        parse_quantity(text)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ProviderError> {
        let result = self.call("eth_getLogs", filter.to_rpc_params()).await?;
        serde_json::from_value(result)
            .map_err(|e| ProviderError::BadResponse(format!("eth_getLogs: {e}")))
    }
}
