//! Raw log records and log filters.

use alloy_primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// A raw, undecoded log as produced by the node (`eth_getLogs` or an
/// `eth_subscription` notification). This is the input to the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Contract that emitted the log
    pub address: Address,
    /// `topics[0]` is the event signature hash; the rest are indexed params.
    pub topics: Vec<B256>,
    /// ABI-packed non-indexed parameters
    #[serde(default)]
    pub data: Bytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub transaction_index: Option<u64>,
    #[serde(default, with = "quantity", skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u64>,
    /// Set by the node when the log was dropped by a chain reorganization.
    #[serde(default)]
    pub removed: bool,
}

impl LogRecord {
    /// A log with no positional metadata.
    pub fn new(address: Address, topics: Vec<B256>, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            topics,
            data: data.into(),
            block_hash: None,
            block_number: None,
            transaction_hash: None,
            transaction_index: None,
            log_index: None,
            removed: false,
        }
    }

    /// Attach block number and log index (builder style, mostly for fixtures).
    pub fn at(mut self, block_number: u64, log_index: u64) -> Self {
        self.block_number = Some(block_number);
        self.log_index = Some(log_index);
        self
    }

    /// `topics[0]`, the event signature hash, if present.
    pub fn signature(&self) -> Option<B256> {
        self.topics.first().copied()
    }

    /// `topics[1..]`, the indexed parameter slots.
    pub fn indexed_topics(&self) -> &[B256] {
        self.topics.get(1..).unwrap_or(&[])
    }
}

/// Hex-quantity (`"0x1a"`) serde for optional integers.
mod quantity {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(n) => s.serialize_str(&format!("{n:#x}")),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        raw.map(|s| super::parse_quantity(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Parse a JSON-RPC quantity: `0x`-prefixed hex, or plain decimal.
pub fn parse_quantity(s: &str) -> Result<u64, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).map_err(|e| format!("invalid quantity '{s}': {e}")),
        None => s.parse::<u64>().map_err(|e| format!("invalid quantity '{s}': {e}")),
    }
}

/// A block reference accepted by `eth_getLogs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockTag {
    Number(u64),
    #[default]
    Latest,
    Earliest,
    Pending,
    Safe,
    Finalized,
}

impl BlockTag {
    pub fn as_number(&self) -> Option<u64> {
        match self {
            BlockTag::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<u64> for BlockTag {
    fn from(n: u64) -> Self {
        BlockTag::Number(n)
    }
}

impl fmt::Display for BlockTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockTag::Number(n) => write!(f, "{n:#x}"),
            BlockTag::Latest => write!(f, "latest"),
            BlockTag::Earliest => write!(f, "earliest"),
            BlockTag::Pending => write!(f, "pending"),
            BlockTag::Safe => write!(f, "safe"),
            BlockTag::Finalized => write!(f, "finalized"),
        }
    }
}

impl FromStr for BlockTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" => Ok(BlockTag::Latest),
            "earliest" => Ok(BlockTag::Earliest),
            "pending" => Ok(BlockTag::Pending),
            "safe" => Ok(BlockTag::Safe),
            "finalized" => Ok(BlockTag::Finalized),
            other => parse_quantity(other).map(BlockTag::Number),
        }
    }
}

/// Address/topic/range filter shared by historical queries and live subscriptions.
///
/// `topics[i]` constrains topic slot `i`: `None` matches anything, `Some(set)`
/// matches any value in `set`. Block bounds are ignored by live subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub addresses: Vec<Address>,
    pub topics: Vec<Option<Vec<B256>>>,
    pub from_block: Option<BlockTag>,
    pub to_block: Option<BlockTag>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: Address) -> Self {
        self.addresses.push(address);
        self
    }

    pub fn addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.addresses.extend(addresses);
        self
    }

    /// Restrict `topics[0]` to a single event signature hash.
    pub fn event_signature(self, signature: B256) -> Self {
        self.topic(0, [signature])
    }

    /// Restrict topic slot `position` to any of `values`.
    pub fn topic(mut self, position: usize, values: impl IntoIterator<Item = B256>) -> Self {
        if self.topics.len() <= position {
            self.topics.resize(position + 1, None);
        }
        self.topics[position] = Some(values.into_iter().collect());
        self
    }

    pub fn from_block(mut self, block: impl Into<BlockTag>) -> Self {
        self.from_block = Some(block.into());
        self
    }

    pub fn to_block(mut self, block: impl Into<BlockTag>) -> Self {
        self.to_block = Some(block.into());
        self
    }

    /// JSON filter object for `eth_getLogs` (with range) or
    /// `eth_subscribe("logs", ..)` (without range).
    pub fn to_rpc_object(&self, include_range: bool) -> Value {
        let mut obj = serde_json::Map::new();

        match self.addresses.as_slice() {
            [] => {}
            [single] => {
                obj.insert("address".into(), json!(single));
            }
            many => {
                obj.insert("address".into(), json!(many));
            }
        }

        let last_constrained = self.topics.iter().rposition(Option::is_some);
        if let Some(last) = last_constrained {
            let topics: Vec<Value> = self.topics[..=last]
                .iter()
                .map(|slot| match slot.as_deref() {
                    None => Value::Null,
                    Some([single]) => json!(single),
                    Some(many) => json!(many),
                })
                .collect();
            obj.insert("topics".into(), Value::Array(topics));
        }

        if include_range {
            if let Some(from) = self.from_block {
                obj.insert("fromBlock".into(), Value::String(from.to_string()));
            }
            if let Some(to) = self.to_block {
                obj.insert("toBlock".into(), Value::String(to.to_string()));
            }
        }

        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

    #[test]
    fn log_record_from_node_json() {
        let json = r#"{
            "address":"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "topics":["0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"],
            "data":"0x0000000000000000000000000000000000000000000000000000000000000001",
            "blockNumber":"0x1234","logIndex":"0x2",
            "blockHash":"0x0000000000000000000000000000000000000000000000000000000000000abc",
            "transactionHash":"0x0000000000000000000000000000000000000000000000000000000000000def",
            "transactionIndex":"0x0",
            "removed":false
        }"#;
        let log: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(log.block_number, Some(0x1234));
        assert_eq!(log.log_index, Some(2));
        assert_eq!(log.data.len(), 32);
        assert_eq!(log.signature().unwrap(), TRANSFER.parse::<B256>().unwrap());
        assert!(log.indexed_topics().is_empty());
    }

    #[test]
    fn pending_log_has_no_position() {
        let json = r#"{"address":"0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48","topics":[],"data":"0x","blockNumber":null,"logIndex":null}"#;
        let log: LogRecord = serde_json::from_str(json).unwrap();
        assert_eq!(log.block_number, None);
        assert!(log.signature().is_none());
    }

    #[test]
    fn block_tag_parse_and_display() {
        assert_eq!("latest".parse::<BlockTag>().unwrap(), BlockTag::Latest);
        assert_eq!("6920583".parse::<BlockTag>().unwrap(), BlockTag::Number(6_920_583));
        assert_eq!("0x10".parse::<BlockTag>().unwrap(), BlockTag::Number(16));
        assert_eq!(BlockTag::Number(255).to_string(), "0xff");
        assert!("soon".parse::<BlockTag>().is_err());
    }

    #[test]
    fn filter_rpc_object() {
        let sig: B256 = TRANSFER.parse().unwrap();
        let addr: Address = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".parse().unwrap();
        let filter = LogFilter::new()
            .address(addr)
            .event_signature(sig)
            .from_block(100u64)
            .to_block(BlockTag::Latest);

        let obj = filter.to_rpc_object(true);
        assert_eq!(obj["fromBlock"], "0x64");
        assert_eq!(obj["toBlock"], "latest");
        assert_eq!(obj["topics"][0], TRANSFER);
        assert!(obj["address"].is_string());

        let live = filter.to_rpc_object(false);
        assert!(live.get("fromBlock").is_none());
    }

    #[test]
    fn filter_wildcard_topic_slots() {
        let a = B256::repeat_byte(0x11);
        let b = B256::repeat_byte(0x22);
        let filter = LogFilter::new().topic(2, [a, b]);
        let obj = filter.to_rpc_object(false);
        let topics = obj["topics"].as_array().unwrap();
        assert_eq!(topics.len(), 3);
        assert!(topics[0].is_null());
        assert!(topics[1].is_null());
        assert_eq!(topics[2].as_array().unwrap().len(), 2);
    }
}
