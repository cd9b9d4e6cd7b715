//! Node collaborator traits.
//!
//! The core never talks to a node directly. Historical retrieval goes through
//! [`LogSource`], live delivery through [`LogSubscriber`]. Concrete HTTP and
//! WebSocket implementations live in `chainlogs-stream`; tests plug in mocks.

use crate::error::{StreamError, TransportError};
use crate::log::{BlockTag, LogFilter, LogRecord};
use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A live stream of raw logs.
///
/// An `Err` item is terminal: the subscriber yields nothing after it. The end
/// of the stream without an error means the node closed the subscription.
/// Dropping the stream releases the underlying subscription.
pub type RawLogStream = Pin<Box<dyn Stream<Item = Result<LogRecord, StreamError>> + Send>>;

/// Pull-based log retrieval (`eth_getLogs` and friends).
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Fetch all logs matching `filter` in one request, in node order.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, TransportError>;

    /// Current head block number.
    async fn block_number(&self) -> Result<u64, TransportError>;

    /// Deployed bytecode at `address` (empty when no contract exists).
    async fn code_at(&self, address: Address, block: BlockTag) -> Result<Bytes, TransportError>;
}

/// Push-based log delivery (`eth_subscribe("logs", ..)`).
#[async_trait]
pub trait LogSubscriber: Send + Sync {
    /// Open a new subscription. Each call yields an independent stream.
    async fn subscribe_logs(&self, filter: &LogFilter) -> Result<RawLogStream, StreamError>;
}
