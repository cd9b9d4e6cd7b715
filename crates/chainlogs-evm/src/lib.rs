//! # chainlogs-evm
//!
//! EVM interface registry and log decoder.
//!
//! ## Implementation notes
//! - Uses `alloy-core` for ABI type parsing and value decoding
//! - `topics[0]` → event signature hash (keccak256 of the canonical signature)
//! - `topics[1..]` → indexed parameters, one 32-byte slot each
//! - `data` → non-indexed parameters, statically encoded words

pub mod abi_json;
pub mod decoder;
pub mod encoder;
pub mod normalizer;
pub mod schema;
pub mod signature;

pub use decoder::{DecodePolicy, DecodedBatch, LogDecoder};
pub use encoder::{EncodeError, LogEncoder};
pub use schema::{EventDescriptor, FunctionDescriptor, InterfaceSchema, ParameterDescriptor};
pub use signature::{event_signature_hash, function_selector, keccak256};
