//! Decoded value representation.
//!
//! Every decoded parameter is normalized into an [`AbiValue`] so consumers
//! never need to handle alloy's dynamic value types directly.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded, normalized ABI value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AbiValue {
    Uint(u128),
    /// Large uints (> u128) stored as decimal string
    BigUint(String),
    Int(i128),
    /// Large ints (> i128) stored as decimal string
    BigInt(String),
    Bool(bool),
    /// 20-byte address, EIP-55 checksummed with 0x prefix
    Address(String),
    /// `bytes1` .. `bytes32`
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    Str(String),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
    /// Indexed parameter of a dynamic type: the topic holds the keccak-256 of
    /// the value, the original value is not recoverable from the log.
    TopicHash(B256),
}

impl AbiValue {
    /// Coerce to a u128 if this is a small Uint.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            AbiValue::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the inner string if this is an Address value.
    pub fn as_address(&self) -> Option<&str> {
        match self {
            AbiValue::Address(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Raw bytes of a fixed or dynamic bytes value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// `true` for indexed dynamic values that only carry a hash.
    pub fn is_topic_hash(&self) -> bool {
        matches!(self, AbiValue::TopicHash(_))
    }

    /// Interpret a bytes value as right-padded UTF-8 text (e.g. a `bytes32`
    /// key written from a short string). Trailing NULs are trimmed; returns
    /// `None` if nothing printable remains.
    pub fn as_text(&self) -> Option<String> {
        let bytes = self.as_bytes()?;
        let end = bytes.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        let text = std::str::from_utf8(&bytes[..end]).ok()?;
        if text.is_empty() || text.chars().any(|c| c.is_control()) {
            return None;
        }
        Some(text.to_string())
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbiValue::Uint(v) => write!(f, "{v}"),
            AbiValue::BigUint(v) => write!(f, "{v}"),
            AbiValue::Int(v) => write!(f, "{v}"),
            AbiValue::BigInt(v) => write!(f, "{v}"),
            AbiValue::Bool(v) => write!(f, "{v}"),
            AbiValue::Address(a) => write!(f, "{a}"),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => write!(f, "0x{}", hex::encode(b)),
            AbiValue::Str(s) => write!(f, "{s}"),
            AbiValue::Array(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AbiValue::Tuple(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            AbiValue::TopicHash(h) => write!(f, "{h} (hash only)"),
        }
    }
}
