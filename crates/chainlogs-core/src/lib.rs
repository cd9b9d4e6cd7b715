//! # chainlogs-core
//!
//! Core types shared across all ChainLogs crates: raw log records and
//! filters, normalized values, decoded events, the error taxonomy, and the
//! traits through which the decoding core consumes an Ethereum node.

pub mod error;
pub mod event;
pub mod log;
pub mod source;
pub mod value;

pub use error::{
    BatchDecodeError, DecodeError, JsonRpcError, LogSegment, QueryError, SchemaParseError,
    StreamError, TransportError,
};
pub use event::{DecodedEvent, DecodedField};
pub use log::{BlockTag, LogFilter, LogRecord};
pub use source::{LogSource, LogSubscriber, RawLogStream};
pub use value::AbiValue;
