//! Log encoder, the inverse of [`crate::LogDecoder`].
//!
//! Builds the `LogRecord` a contract would emit for an event and a set of
//! argument values. Used to produce fixtures and to exercise the decoder
//! without a node.
//!
//! # Usage
//! ```ignore
//! let schema = InterfaceSchema::from_abi_file("fixtures/abi/store.json")?;
//! let log = LogEncoder::new().encode(
//!     schema.event("ItemSet").unwrap(),
//!     contract,
//!     &[DynSolValue::FixedBytes(key, 32), DynSolValue::FixedBytes(value, 32)],
//! )?;
//! ```

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, B256};
use chainlogs_core::log::LogRecord;
use thiserror::Error;

use crate::schema::{EventDescriptor, ParameterDescriptor};
use crate::signature::keccak256;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("argument count mismatch for '{event}': declared {expected}, got {actual}")]
    ArityMismatch {
        event: String,
        expected: usize,
        actual: usize,
    },

    #[error("value for '{event}.{param}' does not match declared type '{ty}'")]
    TypeMismatch {
        event: String,
        param: String,
        ty: String,
    },

    #[error("'{event}.{param}' has dynamic type '{ty}' which cannot be placed in the data payload")]
    UnsupportedDataType {
        event: String,
        param: String,
        ty: String,
    },
}

/// Stateless log encoder.
#[derive(Debug, Default, Clone)]
pub struct LogEncoder;

impl LogEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode `values` (declaration order) into a log emitted by `address`.
    pub fn encode(
        &self,
        event: &EventDescriptor,
        address: Address,
        values: &[DynSolValue],
    ) -> Result<LogRecord, EncodeError> {
        if values.len() != event.params.len() {
            return Err(EncodeError::ArityMismatch {
                event: event.name.clone(),
                expected: event.params.len(),
                actual: values.len(),
            });
        }

        let mut topics = Vec::with_capacity(event.indexed_count() + 1);
        if !event.anonymous {
            topics.push(event.signature_hash);
        }
        let mut data = Vec::new();

        for (param, value) in event.params.iter().zip(values) {
            if !param.abi_type().matches(value) {
                return Err(EncodeError::TypeMismatch {
                    event: event.name.clone(),
                    param: param.name.clone(),
                    ty: param.ty.clone(),
                });
            }
            if param.indexed {
                topics.push(encode_topic(param, value));
            } else if param.data_width().is_some() {
                data.extend_from_slice(&value.abi_encode());
            } else {
                return Err(EncodeError::UnsupportedDataType {
                    event: event.name.clone(),
                    param: param.name.clone(),
                    ty: param.ty.clone(),
                });
            }
        }

        Ok(LogRecord::new(address, topics, data))
    }
}

/// Topic value for an indexed parameter: the 32-byte encoding for value
/// types, the keccak-256 of the packed encoding for reference types.
fn encode_topic(param: &ParameterDescriptor, value: &DynSolValue) -> B256 {
    if !param.is_hashed_in_topic() {
        return B256::from_slice(&value.abi_encode());
    }
    match value {
        DynSolValue::String(s) => keccak256(s.as_bytes()),
        DynSolValue::Bytes(b) => keccak256(b),
        other => keccak256(&other.abi_encode_packed()),
    }
}
