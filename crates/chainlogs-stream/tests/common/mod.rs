//! Shared fixtures: an ERC-20 schema, log builders and in-memory node mocks.

#![allow(dead_code)]

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use chainlogs_core::{
    error::{StreamError, TransportError},
    log::{BlockTag, LogFilter, LogRecord},
    source::{LogSource, LogSubscriber, RawLogStream},
};
use chainlogs_evm::{event_signature_hash, InterfaceSchema};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use tokio::sync::mpsc;

pub fn token() -> Address {
    Address::repeat_byte(0xa0)
}

pub fn erc20() -> Arc<InterfaceSchema> {
    let schema = InterfaceSchema::from_human_readable([
        "event Transfer(address indexed from, address indexed to, uint256 value)",
        "event Approval(address indexed owner, address indexed spender, uint256 value)",
    ])
    .unwrap();
    Arc::new(schema)
}

pub fn transfer_topic() -> B256 {
    event_signature_hash("Transfer(address,address,uint256)")
}

/// A well-formed `Transfer(from, to, value)` log at `(block, 0)`.
pub fn transfer(block: u64, from: u8, to: u8, value: u64) -> LogRecord {
    LogRecord::new(
        token(),
        vec![
            transfer_topic(),
            Address::repeat_byte(from).into_word(),
            Address::repeat_byte(to).into_word(),
        ],
        U256::from(value).to_be_bytes::<32>().to_vec(),
    )
    .at(block, 0)
}

/// A `Transfer` log missing its `to` topic.
pub fn truncated_transfer(block: u64) -> LogRecord {
    let mut log = transfer(block, 1, 2, 3);
    log.topics.truncate(2);
    log
}

pub fn removed(mut log: LogRecord) -> LogRecord {
    log.removed = true;
    log
}

// ─── LogSource mock ───────────────────────────────────────────────────────────

/// Answers every `get_logs` with the same canned response.
pub struct MockSource {
    response: Result<Vec<LogRecord>, TransportError>,
    pub calls: AtomicUsize,
    pub last_filter: Mutex<Option<LogFilter>>,
}

impl MockSource {
    pub fn with_logs(logs: Vec<LogRecord>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(logs),
            calls: AtomicUsize::new(0),
            last_filter: Mutex::new(None),
        })
    }

    pub fn failing(err: TransportError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(err),
            calls: AtomicUsize::new(0),
            last_filter: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for MockSource {
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        self.response.clone()
    }

    async fn block_number(&self) -> Result<u64, TransportError> {
        Ok(0)
    }

    async fn code_at(&self, _: Address, _: BlockTag) -> Result<Bytes, TransportError> {
        Ok(Bytes::new())
    }
}

// ─── LogSubscriber mock ───────────────────────────────────────────────────────

pub type UpstreamSender = mpsc::Sender<Result<LogRecord, StreamError>>;

/// Hands out one pre-wired channel as the raw log stream. The test keeps the
/// sending half and plays the node.
pub struct MockSubscriber {
    upstream: Mutex<Option<mpsc::Receiver<Result<LogRecord, StreamError>>>>,
}

impl MockSubscriber {
    pub fn new() -> (Arc<Self>, UpstreamSender) {
        let (tx, rx) = mpsc::channel(64);
        let subscriber = Arc::new(Self {
            upstream: Mutex::new(Some(rx)),
        });
        (subscriber, tx)
    }
}

#[async_trait]
impl LogSubscriber for MockSubscriber {
    async fn subscribe_logs(&self, _: &LogFilter) -> Result<RawLogStream, StreamError> {
        let mut rx = self
            .upstream
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| StreamError::Subscribe("already subscribed".into()))?;
        Ok(Box::pin(futures::stream::poll_fn(move |cx| rx.poll_recv(cx))))
    }
}

/// Rejects every subscription.
pub struct RejectingSubscriber;

#[async_trait]
impl LogSubscriber for RejectingSubscriber {
    async fn subscribe_logs(&self, _: &LogFilter) -> Result<RawLogStream, StreamError> {
        Err(StreamError::ConnectionFailed {
            url: "ws://node".into(),
            reason: "connection refused".into(),
        })
    }
}
