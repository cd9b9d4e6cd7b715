//! Node, query and subscription configuration.

use chainlogs_evm::DecodePolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where and how to reach the Ethereum node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// HTTP JSON-RPC endpoint used for historical queries, e.g. "https://eth.llamarpc.com"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_url: Option<String>,
    /// WebSocket endpoint used for live subscriptions, e.g. "wss://mainnet.infura.io/ws/v3/..."
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ws_url: Option<String>,
    /// Per-request timeout for HTTP calls and the WebSocket handshake
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 { 30_000 }

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http_url: None,
            ws_url: None,
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl NodeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Historical query behaviour.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    /// What to do with a log that fails to decode
    #[serde(default)]
    pub decode_policy: DecodePolicy,
}

/// What a live subscription does when a single log fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Report the failure as an item and keep the subscription active.
    #[default]
    Isolate,
    /// Fail the whole subscription.
    Terminate,
}

/// Live subscription behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionConfig {
    /// Decoded item channel capacity; a slow consumer applies backpressure
    /// to the node connection once it fills
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default)]
    pub decode_failure: DecodeFailurePolicy,
}

fn default_channel_capacity() -> usize { 1_024 }

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            decode_failure: DecodeFailurePolicy::default(),
        }
    }
}
