//! Decoded event types, the primary output of ChainLogs.

use crate::log::LogRecord;
use crate::value::AbiValue;
use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// One decoded event parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedField {
    pub name: String,
    pub value: AbiValue,
    /// Whether the value came from a topic slot rather than the data payload
    pub indexed: bool,
}

/// A fully decoded event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedEvent {
    /// Matched event name, e.g. "ItemSet"
    pub name: String,
    /// `topics[0]` of the source log
    pub signature: B256,
    /// Contract that emitted the log
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    /// Fields in declaration order
    pub fields: Vec<DecodedField>,
}

impl DecodedEvent {
    /// Start an event for `log` with positional metadata copied over.
    pub fn for_log(name: impl Into<String>, signature: B256, log: &LogRecord) -> Self {
        Self {
            name: name.into(),
            signature,
            address: log.address,
            block_hash: log.block_hash,
            block_number: log.block_number,
            transaction_hash: log.transaction_hash,
            log_index: log.log_index,
            fields: Vec::new(),
        }
    }

    /// Get a field value by name.
    pub fn field(&self, name: &str) -> Option<&AbiValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Fields decoded from `topics[1..]`.
    pub fn indexed_fields(&self) -> impl Iterator<Item = &DecodedField> {
        self.fields.iter().filter(|f| f.indexed)
    }

    /// Fields decoded from the data payload.
    pub fn data_fields(&self) -> impl Iterator<Item = &DecodedField> {
        self.fields.iter().filter(|f| !f.indexed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;

    #[test]
    fn field_lookup() {
        let log = LogRecord::new(Address::ZERO, vec![B256::ZERO], Bytes::new()).at(7, 1);
        let mut event = DecodedEvent::for_log("ItemSet", B256::ZERO, &log);
        event.fields.push(DecodedField {
            name: "key".into(),
            value: AbiValue::TopicHash(B256::ZERO),
            indexed: true,
        });
        event.fields.push(DecodedField {
            name: "value".into(),
            value: AbiValue::Uint(1),
            indexed: false,
        });

        assert_eq!(event.block_number, Some(7));
        assert_eq!(event.field("value"), Some(&AbiValue::Uint(1)));
        assert!(event.field("missing").is_none());
        assert_eq!(event.indexed_fields().count(), 1);
        assert_eq!(event.data_fields().count(), 1);
    }
}
