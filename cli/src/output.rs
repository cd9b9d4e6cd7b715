//! Human-readable rendering of decoded events and schemas.

use chainlogs_core::{AbiValue, DecodedEvent};
use chainlogs_evm::{InterfaceSchema, ParameterDescriptor};
use std::fmt::Write;

/// One value, with the text form appended when the bytes spell a string.
pub fn value(v: &AbiValue) -> String {
    match v.as_text() {
        Some(text) => format!("{v} (\"{text}\")"),
        None => v.to_string(),
    }
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "pending".to_string(), |v| v.to_string())
}

pub fn event(ordinal: usize, e: &DecodedEvent) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Event #{ordinal}: {} ===", e.name);
    let _ = writeln!(out, "  Contract:     {}", e.address);
    let _ = writeln!(out, "  Block hash:   {}", opt(e.block_hash));
    let _ = writeln!(out, "  Block number: {}", opt(e.block_number));
    let _ = writeln!(out, "  Tx hash:      {}", opt(e.transaction_hash));
    let _ = writeln!(out, "  Log index:    {}", opt(e.log_index));
    let _ = writeln!(out, "  Topics:");
    let _ = writeln!(out, "    [0] {}", e.signature);
    for (i, field) in e.indexed_fields().enumerate() {
        let _ = writeln!(out, "    [{}] {} = {}", i + 1, field.name, value(&field.value));
    }
    let data: Vec<_> = e.data_fields().collect();
    if !data.is_empty() {
        let _ = writeln!(out, "  Data:");
        for field in data {
            let _ = writeln!(out, "    {} = {}", field.name, value(&field.value));
        }
    }
    out
}

fn params(params: &[ParameterDescriptor]) -> String {
    params
        .iter()
        .map(|p| {
            let indexed = if p.indexed { " indexed" } else { "" };
            if p.name.is_empty() {
                format!("{}{indexed}", p.ty)
            } else {
                format!("{}{indexed} {}", p.ty, p.name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn schema(schema: &InterfaceSchema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Events ({}):", schema.event_count());
    for e in schema.events() {
        let anonymous = if e.anonymous { " [anonymous]" } else { "" };
        let _ = writeln!(out, "  {}({}){anonymous}", e.name, params(&e.params));
        let _ = writeln!(out, "    signature: {}", e.signature);
        let _ = writeln!(out, "    topic0:    {}", e.signature_hash);
    }
    let _ = writeln!(out, "Functions ({}):", schema.functions().len());
    for f in schema.functions() {
        let _ = writeln!(
            out,
            "  0x{}  {}({})",
            hex::encode(f.selector),
            f.name,
            params(&f.inputs)
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, B256};
    use chainlogs_core::{DecodedField, LogRecord};

    #[test]
    fn text_hint_for_padded_bytes32() {
        let mut raw = vec![0u8; 32];
        raw[..3].copy_from_slice(b"bar");
        let rendered = value(&AbiValue::FixedBytes(raw));
        assert!(rendered.starts_with("0x626172"));
        assert!(rendered.ends_with("(\"bar\")"));
        assert_eq!(value(&AbiValue::Uint(7)), "7");
    }

    #[test]
    fn event_block_lists_topics_and_data() {
        let log = LogRecord::new(Address::ZERO, vec![B256::ZERO], Bytes::new()).at(6_920_583, 4);
        let mut e = DecodedEvent::for_log("ItemSet", B256::ZERO, &log);
        e.fields.push(DecodedField {
            name: "key".into(),
            value: AbiValue::FixedBytes(vec![0x11; 32]),
            indexed: true,
        });
        e.fields.push(DecodedField {
            name: "value".into(),
            value: AbiValue::Uint(1),
            indexed: false,
        });

        let text = event(1, &e);
        assert!(text.contains("=== Event #1: ItemSet ==="));
        assert!(text.contains("Block number: 6920583"));
        assert!(text.contains("Log index:    4"));
        assert!(text.contains("Block hash:   pending"));
        assert!(text.contains("[1] key = 0x1111"));
        assert!(text.contains("value = 1"));
    }

    #[test]
    fn schema_listing() {
        let s = InterfaceSchema::from_human_readable([
            "event ItemSet(bytes32 indexed key, bytes32 value)",
            "function setItem(bytes32 key, bytes32 value)",
        ])
        .unwrap();
        let text = schema(&s);
        assert!(text.contains("ItemSet(bytes32 indexed key, bytes32 value)"));
        assert!(text.contains(
            "topic0:    0xe79e73da417710ae99aa2088575580a60415d359acfad9cdd3382d59c80281d4"
        ));
        assert!(text.contains("setItem(bytes32 key, bytes32 value)"));
    }
}
