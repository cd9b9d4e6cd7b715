//! Error types for the ChainLogs schema, decode, query and streaming pipeline.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading an interface description (ABI JSON).
#[derive(Debug, Error)]
pub enum SchemaParseError {
    #[error("Malformed interface description: {0}")]
    Malformed(String),

    #[error("Duplicate event name '{name}'")]
    DuplicateEvent { name: String },

    #[error("{item} parameter #{position} is missing its '{attribute}' attribute")]
    MissingAttribute {
        item: String,
        position: usize,
        attribute: &'static str,
    },

    #[error("{kind} entry #{position} has no name")]
    MissingName { kind: String, position: usize },

    #[error("Invalid type '{ty}' in {item}: {reason}")]
    InvalidType {
        item: String,
        ty: String,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Which part of a log disagreed with the declared event layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSegment {
    /// Indexed parameters, `topics[1..]`.
    Topics,
    /// Non-indexed parameters, the data payload (measured in bytes).
    Data,
}

impl std::fmt::Display for LogSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogSegment::Topics => write!(f, "indexed topics"),
            LogSegment::Data => write!(f, "data bytes"),
        }
    }
}

/// Errors that can occur while decoding a single log.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// `topics[0]` is absent or matches no event in the schema.
    #[error("Unknown event: {}", signature.map(|s| s.to_string()).unwrap_or_else(|| "<no signature topic>".into()))]
    UnknownEvent { signature: Option<B256> },

    /// The log is structurally inconsistent with the declared event.
    #[error("Field count mismatch for '{event}': expected {expected} {segment}, got {actual}")]
    FieldCountMismatch {
        event: String,
        segment: LogSegment,
        expected: usize,
        actual: usize,
    },

    /// Non-indexed parameter with a dynamic ABI encoding.
    #[error("Unsupported non-indexed type '{ty}' for '{event}.{param}': dynamic data types are not decoded")]
    UnsupportedDataType {
        event: String,
        param: String,
        ty: String,
    },

    #[error("ABI decode of '{event}.{param}' failed: {reason}")]
    AbiDecodeFailed {
        event: String,
        param: String,
        reason: String,
    },
}

impl DecodeError {
    /// Short stable label, used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodeError::UnknownEvent { .. } => "unknown_event",
            DecodeError::FieldCountMismatch { .. } => "field_count_mismatch",
            DecodeError::UnsupportedDataType { .. } => "unsupported_data_type",
            DecodeError::AbiDecodeFailed { .. } => "abi_decode_failed",
        }
    }
}

/// A decode failure inside a batch, tagged with the log's position.
#[derive(Debug, Clone, Error)]
#[error("Decode error at log #{index}: {source}")]
pub struct BatchDecodeError {
    pub index: usize,
    #[source]
    pub source: DecodeError,
}

/// A JSON-RPC 2.0 error object returned by the node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// Errors raised by a node transport (HTTP or WebSocket).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// HTTP request failed (connection refused, non-2xx status, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// WebSocket connection/send/receive error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// JSON-RPC protocol-level error returned by the node.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Response could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl TransportError {
    /// Returns `true` when the node refused the request because the block
    /// range or the result set exceeds a provider limit.
    pub fn is_range_limit(&self) -> bool {
        let Self::Rpc(err) = self else {
            return false;
        };
        if err.code == -32005 {
            return true;
        }
        let msg = err.message.to_lowercase();
        [
            "block range",
            "range too large",
            "range is too large",
            "more than",
            "response size",
            "too many results",
            "query timeout exceeded",
        ]
        .iter()
        .any(|needle| msg.contains(needle))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Deserialization(err.to_string())
    }
}

/// Errors from the historical query engine.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Invalid block range: from {from} is after to {to}")]
    InvalidRange { from: u64, to: u64 },

    /// The node enforces a maximum range or result size; the caller must chunk.
    #[error("Block range too large: {reason}")]
    RangeTooLarge { reason: String },

    #[error("Log retrieval failed: {0}")]
    Transport(#[source] TransportError),

    #[error("Decode error at log #{index}: {source}")]
    Decode {
        index: usize,
        #[source]
        source: DecodeError,
    },
}

impl From<BatchDecodeError> for QueryError {
    fn from(err: BatchDecodeError) -> Self {
        QueryError::Decode {
            index: err.index,
            source: err.source,
        }
    }
}

impl From<TransportError> for QueryError {
    fn from(err: TransportError) -> Self {
        if err.is_range_limit() {
            QueryError::RangeTooLarge {
                reason: err.to_string(),
            }
        } else {
            QueryError::Transport(err)
        }
    }
}

/// Errors from live subscriptions. Every variant is terminal for its handle.
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    #[error("RPC connection failed: {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Subscription request rejected: {0}")]
    Subscribe(String),

    /// The live channel failed after it was established.
    #[error("Subscription transport error: {0}")]
    Transport(String),

    #[error("Stream closed unexpectedly")]
    Closed,

    /// Only produced when the subscription runs with the terminate-on-decode-error policy.
    #[error("Decode error in stream: {0}")]
    Decode(#[from] DecodeError),
}

impl From<TransportError> for StreamError {
    fn from(err: TransportError) -> Self {
        StreamError::Transport(err.to_string())
    }
}
