//! `LogDecoder`: turns raw EVM logs into [`DecodedEvent`]s.
//!
//! Decoding walks the event's parameters in declaration order with two
//! cursors: indexed parameters consume `topics[1..]` one slot each,
//! non-indexed parameters consume the data payload by their static width.
//! Structural checks happen up front so a log whose topic count or data
//! length disagrees with the declaration is rejected before any value is
//! produced.

use alloy_primitives::B256;
use chainlogs_core::{
    error::{BatchDecodeError, DecodeError, LogSegment},
    event::{DecodedEvent, DecodedField},
    log::LogRecord,
    value::AbiValue,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalizer;
use crate::schema::{EventDescriptor, InterfaceSchema, ParameterDescriptor};

/// What a batch decode does with a log that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Abort the batch on the first failure (in log order).
    #[default]
    FailFast,
    /// Keep going; failures are reported alongside the decoded events.
    Skip,
}

/// Result of [`LogDecoder::decode_batch`].
#[derive(Debug, Clone, Default)]
pub struct DecodedBatch {
    /// Decoded events in input order
    pub events: Vec<DecodedEvent>,
    /// Logs that failed under [`DecodePolicy::Skip`], with their input index
    pub skipped: Vec<BatchDecodeError>,
}

/// The EVM log decoder. Stateless and cheap to clone; the schema is passed
/// per call so one decoder serves any number of interfaces.
#[derive(Debug, Default, Clone)]
pub struct LogDecoder;

impl LogDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode one log against `schema`.
    pub fn decode(
        &self,
        schema: &InterfaceSchema,
        log: &LogRecord,
    ) -> Result<DecodedEvent, DecodeError> {
        let signature = log
            .signature()
            .ok_or(DecodeError::UnknownEvent { signature: None })?;
        let event = schema
            .event_by_signature(&signature)
            .ok_or(DecodeError::UnknownEvent {
                signature: Some(signature),
            })?;

        check_layout(event, log)?;

        let mut decoded = DecodedEvent::for_log(&event.name, signature, log);
        let mut topics = log.indexed_topics().iter();
        let mut offset = 0usize;

        for param in &event.params {
            let value = if param.indexed {
                let topic = topics.next().ok_or(DecodeError::FieldCountMismatch {
                    event: event.name.clone(),
                    segment: LogSegment::Topics,
                    expected: event.indexed_count(),
                    actual: log.indexed_topics().len(),
                })?;
                decode_topic(event, param, topic)?
            } else {
                let width = param.data_width().ok_or_else(|| unsupported(event, param))?;
                let slot = &log.data[offset..offset + width];
                offset += width;
                decode_slot(event, param, slot)?
            };
            decoded.fields.push(DecodedField {
                name: param.name.clone(),
                value,
                indexed: param.indexed,
            });
        }

        Ok(decoded)
    }

    /// Decode many logs in parallel. Output order always matches input order.
    pub fn decode_batch(
        &self,
        schema: &InterfaceSchema,
        logs: &[LogRecord],
        policy: DecodePolicy,
    ) -> Result<DecodedBatch, BatchDecodeError> {
        let results: Vec<Result<DecodedEvent, DecodeError>> = logs
            .par_iter()
            .map(|log| self.decode(schema, log))
            .collect();

        let mut batch = DecodedBatch {
            events: Vec::with_capacity(logs.len()),
            skipped: Vec::new(),
        };

        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(event) => batch.events.push(event),
                Err(source) => {
                    let err = BatchDecodeError { index, source };
                    match policy {
                        DecodePolicy::FailFast => return Err(err),
                        DecodePolicy::Skip => batch.skipped.push(err),
                    }
                }
            }
        }

        debug!(
            total = logs.len(),
            decoded = batch.events.len(),
            skipped = batch.skipped.len(),
            "batch decoded"
        );
        Ok(batch)
    }
}

/// Verify topic count and data length against the declaration.
fn check_layout(event: &EventDescriptor, log: &LogRecord) -> Result<(), DecodeError> {
    let expected_topics = event.indexed_count();
    let actual_topics = log.indexed_topics().len();
    if expected_topics != actual_topics {
        return Err(DecodeError::FieldCountMismatch {
            event: event.name.clone(),
            segment: LogSegment::Topics,
            expected: expected_topics,
            actual: actual_topics,
        });
    }

    let mut expected_len = 0usize;
    for param in event.data_params() {
        expected_len = param
            .data_width()
            .and_then(|width| expected_len.checked_add(width))
            .ok_or_else(|| unsupported(event, param))?;
    }
    if expected_len != log.data.len() {
        return Err(DecodeError::FieldCountMismatch {
            event: event.name.clone(),
            segment: LogSegment::Data,
            expected: expected_len,
            actual: log.data.len(),
        });
    }
    Ok(())
}

fn unsupported(event: &EventDescriptor, param: &ParameterDescriptor) -> DecodeError {
    DecodeError::UnsupportedDataType {
        event: event.name.clone(),
        param: param.name.clone(),
        ty: param.ty.clone(),
    }
}

/// Decode one indexed topic.
///
/// Value types are ABI-encoded into the 32-byte slot and recovered as-is.
/// Reference types (string, bytes, arrays, tuples) are stored as the
/// keccak-256 of their encoding; only the hash is available.
fn decode_topic(
    event: &EventDescriptor,
    param: &ParameterDescriptor,
    topic: &B256,
) -> Result<AbiValue, DecodeError> {
    if param.is_hashed_in_topic() {
        return Ok(AbiValue::TopicHash(*topic));
    }
    decode_slot(event, param, topic.as_slice())
}

fn decode_slot(
    event: &EventDescriptor,
    param: &ParameterDescriptor,
    bytes: &[u8],
) -> Result<AbiValue, DecodeError> {
    param
        .abi_type()
        .abi_decode(bytes)
        .map(normalizer::normalize)
        .map_err(|e| DecodeError::AbiDecodeFailed {
            event: event.name.clone(),
            param: param.name.clone(),
            reason: e.to_string(),
        })
}
