//! HTTP JSON-RPC [`LogSource`] backed by `reqwest`.
//!
//! One POST per call, no retries: the historical query engine issues a
//! single `eth_getLogs` and reports node limits to the caller instead of
//! paginating.

use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use chainlogs_core::{
    error::TransportError,
    log::{parse_quantity, BlockTag, LogFilter, LogRecord},
    source::LogSource,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::NodeConfig;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};

/// JSON-RPC client for pull-based log retrieval.
pub struct HttpLogSource {
    url: String,
    http: reqwest::Client,
    request_timeout: Duration,
    next_id: AtomicU64,
}

impl HttpLogSource {
    /// Create a client for the given JSON-RPC endpoint URL. The endpoint is
    /// not contacted until the first call.
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> Result<Self, TransportError> {
        let url = url.into();
        url::Url::parse(&url)
            .map_err(|e| TransportError::Http(format!("invalid URL '{url}': {e}")))?;

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;

        Ok(Self {
            url,
            http,
            request_timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Create a client from `node.http_url`.
    pub fn from_config(node: &NodeConfig) -> Result<Self, TransportError> {
        let url = node
            .http_url
            .as_deref()
            .ok_or_else(|| TransportError::Http("no HTTP endpoint configured".into()))?;
        Self::new(url, node.request_timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and deserialize its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let req = JsonRpcRequest::new(id, method, params);
        debug!(method, id, url = %self.url, "rpc request");

        let resp = self
            .http
            .post(&self.url)
            .json(&req)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::Http(format!("HTTP {status}: {body}")));
        }

        let body: JsonRpcResponse = resp.json().await.map_err(|e| self.classify(e))?;
        let result = body.into_result().map_err(TransportError::Rpc)?;
        Ok(serde_json::from_value(result)?)
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                ms: millis(self.request_timeout),
            }
        } else if err.is_decode() {
            TransportError::Deserialization(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

#[async_trait]
impl LogSource for HttpLogSource {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, TransportError> {
        self.call("eth_getLogs", vec![filter.to_rpc_object(true)])
            .await
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        let raw: String = self.call("eth_blockNumber", vec![]).await?;
        parse_quantity(&raw).map_err(TransportError::Deserialization)
    }

    async fn code_at(&self, address: Address, block: BlockTag) -> Result<Bytes, TransportError> {
        self.call("eth_getCode", vec![json!(address), json!(block.to_string())])
            .await
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
