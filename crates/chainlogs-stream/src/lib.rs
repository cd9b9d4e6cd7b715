//! # chainlogs-stream
//!
//! Historical queries and live subscriptions over an Ethereum node.
//!
//! Both engines take a [`LogFilter`](chainlogs_core::LogFilter), fetch raw
//! logs through a node collaborator, and decode them against one
//! [`InterfaceSchema`](chainlogs_evm::InterfaceSchema).
//!
//! ## Architecture
//! ```text
//! HttpLogSource (eth_getLogs)          WsLogSubscriber (eth_subscribe)
//!       │                                     │
//!       ▼                                     ▼
//! HistoricalQuery::run               LiveSubscriber::subscribe
//!       │                                     │ (Tokio task per subscription)
//!       ▼                                     ▼
//! LogDecoder::decode_batch            LogDecoder::decode
//!       │                                     │
//!       ▼                                     ▼
//! QueryOutcome                        SubscriptionHandle::next
//! ```

pub mod config;
pub mod http_source;
pub mod query;
pub mod rpc;
pub mod subscription;
pub mod ws_listener;

pub use config::{DecodeFailurePolicy, NodeConfig, QueryConfig, SubscriptionConfig};
pub use http_source::HttpLogSource;
pub use query::{HistoricalQuery, QueryOutcome};
pub use subscription::{
    LiveSubscriber, SubscriptionCanceller, SubscriptionHandle, SubscriptionItem,
    SubscriptionState,
};
pub use ws_listener::WsLogSubscriber;
