//! Interface definition loader.
//!
//! Builds an [`InterfaceSchema`] from a Solidity ABI JSON document, either a
//! bare array or a compiler artifact object carrying an `abi` array. Human
//! readable declarations (`event Transfer(address indexed from, ...)`) are
//! accepted through [`InterfaceSchema::from_human_readable`].
//!
//! The raw entries are parsed with every attribute optional so a missing
//! `indexed` or `type` is reported precisely instead of as a serde error.

use alloy_json_abi::{Event, EventParam, Function, Param};
use chainlogs_core::error::SchemaParseError;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use crate::schema::{EventDescriptor, FunctionDescriptor, InterfaceSchema, ParameterDescriptor};

// ─── Raw ABI serde types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AbiItemRaw {
    /// Absent means `function`.
    #[serde(rename = "type")]
    kind: Option<String>,
    name: Option<String>,
    #[serde(default)]
    inputs: Vec<AbiParamRaw>,
    #[serde(default)]
    outputs: Vec<AbiParamRaw>,
    #[serde(default)]
    anonymous: bool,
    #[serde(rename = "stateMutability")]
    state_mutability: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AbiParamRaw {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    ty: Option<String>,
    indexed: Option<bool>,
    #[serde(default)]
    components: Vec<AbiParamRaw>,
}

impl From<&Param> for AbiParamRaw {
    fn from(p: &Param) -> Self {
        Self {
            name: p.name.clone(),
            ty: Some(p.ty.clone()),
            indexed: None,
            components: p.components.iter().map(Self::from).collect(),
        }
    }
}

impl From<&EventParam> for AbiParamRaw {
    fn from(p: &EventParam) -> Self {
        Self {
            name: p.name.clone(),
            ty: Some(p.ty.clone()),
            indexed: Some(p.indexed),
            components: p.components.iter().map(Self::from).collect(),
        }
    }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

impl InterfaceSchema {
    /// Parse a Solidity ABI JSON document.
    pub fn from_abi_json(raw: &str) -> Result<Self, SchemaParseError> {
        let doc: Value = serde_json::from_str(raw)
            .map_err(|e| SchemaParseError::Malformed(format!("invalid JSON: {e}")))?;

        let entries = match doc {
            Value::Array(items) => items,
            Value::Object(mut obj) => match obj.remove("abi") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(SchemaParseError::Malformed(
                        "expected an ABI array or an object with an 'abi' array".into(),
                    ))
                }
            },
            _ => {
                return Err(SchemaParseError::Malformed(
                    "expected an ABI array or an object with an 'abi' array".into(),
                ))
            }
        };

        let mut schema = InterfaceSchema::new();
        for (position, entry) in entries.into_iter().enumerate() {
            let item: AbiItemRaw = serde_json::from_value(entry)
                .map_err(|e| SchemaParseError::Malformed(format!("entry #{position}: {e}")))?;
            add_item(&mut schema, position, item)?;
        }

        debug!(
            events = schema.event_count(),
            functions = schema.functions().len(),
            "interface schema loaded"
        );
        Ok(schema)
    }

    /// Read and parse an ABI JSON file.
    pub fn from_abi_file(path: impl AsRef<Path>) -> Result<Self, SchemaParseError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_abi_json(&raw)
    }

    /// Parse human-readable declarations, one per entry:
    /// `event ItemSet(bytes32 indexed key, bytes32 value)` or
    /// `function transfer(address to, uint256 amount) returns (bool)`.
    pub fn from_human_readable<'a>(
        declarations: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, SchemaParseError> {
        let mut schema = InterfaceSchema::new();
        for (position, decl) in declarations.into_iter().enumerate() {
            let decl = decl.trim();
            let item = if decl.starts_with("event ") {
                let event = Event::parse(decl)
                    .map_err(|e| SchemaParseError::Malformed(format!("'{decl}': {e}")))?;
                AbiItemRaw {
                    kind: Some("event".into()),
                    name: Some(event.name.clone()),
                    inputs: event.inputs.iter().map(AbiParamRaw::from).collect(),
                    outputs: Vec::new(),
                    anonymous: event.anonymous,
                    state_mutability: None,
                }
            } else if decl.starts_with("function ") {
                let function = Function::parse(decl)
                    .map_err(|e| SchemaParseError::Malformed(format!("'{decl}': {e}")))?;
                AbiItemRaw {
                    kind: Some("function".into()),
                    name: Some(function.name.clone()),
                    inputs: function.inputs.iter().map(AbiParamRaw::from).collect(),
                    outputs: function.outputs.iter().map(AbiParamRaw::from).collect(),
                    anonymous: false,
                    state_mutability: Some(
                        format!("{:?}", function.state_mutability).to_lowercase(),
                    ),
                }
            } else {
                return Err(SchemaParseError::Malformed(format!(
                    "declaration #{position} must start with 'event' or 'function': '{decl}'"
                )));
            };
            add_item(&mut schema, position, item)?;
        }
        Ok(schema)
    }
}

fn add_item(
    schema: &mut InterfaceSchema,
    position: usize,
    item: AbiItemRaw,
) -> Result<(), SchemaParseError> {
    let kind = item.kind.as_deref().unwrap_or("function");
    match kind {
        "event" => {
            let name = required_name(kind, position, item.name)?;
            let params = item
                .inputs
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let indexed = p.indexed.ok_or_else(|| SchemaParseError::MissingAttribute {
                        item: name.clone(),
                        position: i,
                        attribute: "indexed",
                    })?;
                    parameter(&name, i, p, indexed)
                })
                .collect::<Result<Vec<_>, _>>()?;
            schema.add_event(EventDescriptor::new(name, params, item.anonymous))
        }
        "function" => {
            let name = required_name(kind, position, item.name)?;
            let inputs = parameters(&name, &item.inputs)?;
            let outputs = parameters(&name, &item.outputs)?;
            schema.add_function(FunctionDescriptor::new(
                name,
                inputs,
                outputs,
                item.state_mutability,
            ));
            Ok(())
        }
        other => {
            debug!(kind = other, position, "ignoring ABI entry");
            Ok(())
        }
    }
}

fn required_name(
    kind: &str,
    position: usize,
    name: Option<String>,
) -> Result<String, SchemaParseError> {
    match name {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(SchemaParseError::MissingName {
            kind: kind.to_string(),
            position,
        }),
    }
}

fn parameters(
    item: &str,
    raw: &[AbiParamRaw],
) -> Result<Vec<ParameterDescriptor>, SchemaParseError> {
    raw.iter()
        .enumerate()
        .map(|(i, p)| parameter(item, i, p, false))
        .collect()
}

fn parameter(
    item: &str,
    position: usize,
    raw: &AbiParamRaw,
    indexed: bool,
) -> Result<ParameterDescriptor, SchemaParseError> {
    let ty = type_string(item, position, raw)?;
    let name = if raw.name.is_empty() {
        format!("arg{position}")
    } else {
        raw.name.clone()
    };
    ParameterDescriptor::new(item, name, &ty, indexed)
}

/// Expand `tuple`, `tuple[]`, `tuple[2][]` into `(t1,t2,...)` plus the
/// array suffix, recursively through `components`.
fn type_string(
    item: &str,
    position: usize,
    raw: &AbiParamRaw,
) -> Result<String, SchemaParseError> {
    let ty = raw
        .ty
        .as_deref()
        .ok_or_else(|| SchemaParseError::MissingAttribute {
            item: item.to_string(),
            position,
            attribute: "type",
        })?;
    match ty.strip_prefix("tuple") {
        Some(suffix) => {
            let inner = raw
                .components
                .iter()
                .enumerate()
                .map(|(i, c)| type_string(item, i, c))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({}){suffix}", inner.join(",")))
        }
        None => Ok(ty.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_ABI: &str = r#"[
        {"anonymous":false,"inputs":[
            {"indexed":true,"internalType":"bytes32","name":"key","type":"bytes32"},
            {"indexed":false,"internalType":"bytes32","name":"value","type":"bytes32"}],
         "name":"ItemSet","type":"event"},
        {"inputs":[{"internalType":"string","name":"_version","type":"string"}],
         "stateMutability":"nonpayable","type":"constructor"},
        {"inputs":[{"internalType":"bytes32","name":"","type":"bytes32"}],
         "name":"items","outputs":[{"internalType":"bytes32","name":"","type":"bytes32"}],
         "stateMutability":"view","type":"function"},
        {"inputs":[{"name":"key","type":"bytes32"},{"name":"value","type":"bytes32"}],
         "name":"setItem","outputs":[],"stateMutability":"nonpayable","type":"function"}
    ]"#;

    #[test]
    fn loads_store_abi() {
        let schema = InterfaceSchema::from_abi_json(STORE_ABI).unwrap();
        assert_eq!(schema.event_count(), 1);
        assert_eq!(schema.functions().len(), 2);

        let item_set = schema.event("ItemSet").unwrap();
        assert_eq!(item_set.signature, "ItemSet(bytes32,bytes32)");
        assert_eq!(item_set.indexed_count(), 1);
        assert_eq!(item_set.params[0].name, "key");
        assert!(item_set.params[0].indexed);

        let items = &schema.functions()[0];
        assert_eq!(items.inputs[0].name, "arg0");
        assert_eq!(items.state_mutability.as_deref(), Some("view"));
    }

    #[test]
    fn accepts_artifact_object() {
        let artifact = format!(r#"{{"contractName":"Store","abi":{STORE_ABI}}}"#);
        let schema = InterfaceSchema::from_abi_json(&artifact).unwrap();
        assert!(schema.event("ItemSet").is_some());
    }

    #[test]
    fn rejects_non_array_document() {
        let err = InterfaceSchema::from_abi_json(r#"{"events":[]}"#).unwrap_err();
        assert!(matches!(err, SchemaParseError::Malformed(_)));
        let err = InterfaceSchema::from_abi_json("not json").unwrap_err();
        assert!(matches!(err, SchemaParseError::Malformed(_)));
        let err = InterfaceSchema::from_abi_json("42").unwrap_err();
        assert!(matches!(err, SchemaParseError::Malformed(_)));
    }

    #[test]
    fn rejects_missing_indexed() {
        let raw = r#"[{"type":"event","name":"Broken","inputs":[{"name":"x","type":"uint256"}]}]"#;
        let err = InterfaceSchema::from_abi_json(raw).unwrap_err();
        assert!(matches!(
            err,
            SchemaParseError::MissingAttribute { attribute: "indexed", position: 0, .. }
        ));
    }

    #[test]
    fn rejects_missing_type() {
        let raw = r#"[{"type":"event","name":"Broken","inputs":[{"name":"x","indexed":false}]}]"#;
        let err = InterfaceSchema::from_abi_json(raw).unwrap_err();
        assert!(matches!(err, SchemaParseError::MissingAttribute { attribute: "type", .. }));
    }

    #[test]
    fn rejects_missing_event_name() {
        let raw = r#"[{"type":"event","inputs":[]}]"#;
        let err = InterfaceSchema::from_abi_json(raw).unwrap_err();
        assert!(matches!(err, SchemaParseError::MissingName { position: 0, .. }));
    }

    #[test]
    fn rejects_duplicate_event_names() {
        let raw = r#"[
            {"type":"event","name":"Ping","inputs":[]},
            {"type":"event","name":"Ping","inputs":[{"name":"n","type":"uint8","indexed":false}]}
        ]"#;
        let err = InterfaceSchema::from_abi_json(raw).unwrap_err();
        assert!(matches!(err, SchemaParseError::DuplicateEvent { .. }));
    }

    #[test]
    fn rejects_invalid_type() {
        let raw = r#"[{"type":"event","name":"Bad","inputs":[{"name":"x","type":"uint257","indexed":false}]}]"#;
        let err = InterfaceSchema::from_abi_json(raw).unwrap_err();
        assert!(matches!(err, SchemaParseError::InvalidType { .. }));
    }

    #[test]
    fn tuple_components_are_expanded() {
        let raw = r#"[{"type":"event","name":"OrderFilled","inputs":[
            {"name":"id","type":"uint256","indexed":true},
            {"name":"legs","type":"tuple[2]","indexed":false,"components":[
                {"name":"token","type":"address"},
                {"name":"amount","type":"uint128"}]}
        ]}]"#;
        let schema = InterfaceSchema::from_abi_json(raw).unwrap();
        let event = schema.event("OrderFilled").unwrap();
        assert_eq!(event.signature, "OrderFilled(uint256,(address,uint128)[2])");
        assert_eq!(event.params[1].data_width(), Some(128));
    }

    #[test]
    fn error_and_fallback_entries_are_ignored() {
        let raw = r#"[
            {"type":"error","name":"Unauthorized","inputs":[]},
            {"type":"fallback","stateMutability":"payable"},
            {"type":"receive","stateMutability":"payable"}
        ]"#;
        let schema = InterfaceSchema::from_abi_json(raw).unwrap();
        assert!(schema.is_empty());
    }

    #[test]
    fn overloaded_functions_are_kept() {
        let raw = r#"[
            {"type":"function","name":"mint","inputs":[{"name":"to","type":"address"}],"outputs":[]},
            {"type":"function","name":"mint","inputs":[{"name":"to","type":"address"},{"name":"n","type":"uint256"}],"outputs":[]}
        ]"#;
        let schema = InterfaceSchema::from_abi_json(raw).unwrap();
        assert_eq!(schema.functions().len(), 2);
        assert_ne!(schema.functions()[0].selector, schema.functions()[1].selector);
    }

    #[test]
    fn human_readable_declarations() {
        let schema = InterfaceSchema::from_human_readable([
            "event ItemSet(bytes32 indexed key, bytes32 value)",
            "function transfer(address to, uint256 amount) returns (bool)",
        ])
        .unwrap();
        let event = schema.event("ItemSet").unwrap();
        assert_eq!(event.signature, "ItemSet(bytes32,bytes32)");
        assert!(event.params[0].indexed);
        assert!(!event.params[1].indexed);
        assert_eq!(schema.functions()[0].selector, [0xa9, 0x05, 0x9c, 0xbb]);
    }

    #[test]
    fn human_readable_rejects_other_items() {
        let err = InterfaceSchema::from_human_readable(["error Nope()"]).unwrap_err();
        assert!(matches!(err, SchemaParseError::Malformed(_)));
    }

    #[test]
    fn signature_hashes_agree_with_alloy_json_abi() {
        let abi: alloy_json_abi::JsonAbi = serde_json::from_str(STORE_ABI).unwrap();
        let schema = InterfaceSchema::from_abi_json(STORE_ABI).unwrap();
        for event in abi.events() {
            let ours = schema.event(&event.name).unwrap();
            assert_eq!(ours.signature_hash, event.selector());
        }
        for function in abi.functions() {
            assert!(schema.function_by_selector(function.selector().0).is_some());
        }
    }
}
