//! Interface schema: the resolved, immutable form of a contract ABI.
//!
//! An [`InterfaceSchema`] is built once (see [`crate::abi_json`]) and then
//! shared read-only by the decoder, the query engine and every live
//! subscription. Events are kept in declaration order and indexed by their
//! signature hash for `topics[0]` lookup.

use alloy_core::dyn_abi::DynSolType;
use alloy_primitives::B256;
use chainlogs_core::error::SchemaParseError;
use indexmap::IndexMap;
use std::collections::HashMap;

use crate::signature;

/// One event or function parameter with its resolved ABI type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Canonical type name, e.g. `uint256`, `(address,uint256)[]`
    pub ty: String,
    pub indexed: bool,
    kind: DynSolType,
}

impl ParameterDescriptor {
    /// Resolve `ty` into an ABI type. `item` names the owning event or
    /// function for error reporting.
    pub fn new(
        item: &str,
        name: impl Into<String>,
        ty: &str,
        indexed: bool,
    ) -> Result<Self, SchemaParseError> {
        let kind: DynSolType = ty.parse().map_err(|e: alloy_core::dyn_abi::Error| {
            SchemaParseError::InvalidType {
                item: item.to_string(),
                ty: ty.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self {
            name: name.into(),
            ty: kind.sol_type_name().into_owned(),
            indexed,
            kind,
        })
    }

    /// The resolved alloy type.
    pub fn abi_type(&self) -> &DynSolType {
        &self.kind
    }

    /// `true` when an indexed value of this type is stored as a keccak-256
    /// hash instead of its encoding. Only value types fit a topic slot.
    pub fn is_hashed_in_topic(&self) -> bool {
        !matches!(
            self.kind,
            DynSolType::Bool
                | DynSolType::Int(_)
                | DynSolType::Uint(_)
                | DynSolType::FixedBytes(_)
                | DynSolType::Address
                | DynSolType::Function
        )
    }

    /// Bytes this parameter occupies in the data payload, or `None` for
    /// dynamically encoded types and widths that do not fit in `usize`.
    pub fn data_width(&self) -> Option<usize> {
        static_words(&self.kind)?.checked_mul(32)
    }
}

/// Number of 32-byte words a statically encoded type occupies.
fn static_words(ty: &DynSolType) -> Option<usize> {
    match ty {
        DynSolType::String | DynSolType::Bytes | DynSolType::Array(_) => None,
        DynSolType::FixedArray(inner, len) => static_words(inner)?.checked_mul(*len),
        DynSolType::Tuple(inner) => inner
            .iter()
            .try_fold(0usize, |acc, t| acc.checked_add(static_words(t)?)),
        _ => Some(1),
    }
}

/// A declared event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDescriptor {
    pub name: String,
    /// Canonical signature, e.g. `ItemSet(bytes32,bytes32)`
    pub signature: String,
    /// keccak256 of [`Self::signature`], expected in `topics[0]`
    pub signature_hash: B256,
    /// Parameters in declaration order
    pub params: Vec<ParameterDescriptor>,
    /// Anonymous events emit no signature topic
    pub anonymous: bool,
}

impl EventDescriptor {
    pub fn new(name: impl Into<String>, params: Vec<ParameterDescriptor>, anonymous: bool) -> Self {
        let name = name.into();
        let signature =
            signature::canonical_signature(&name, params.iter().map(|p| p.ty.as_str()));
        let signature_hash = signature::event_signature_hash(&signature);
        Self {
            name,
            signature,
            signature_hash,
            params,
            anonymous,
        }
    }

    pub fn indexed_params(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter().filter(|p| p.indexed)
    }

    pub fn data_params(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.params.iter().filter(|p| !p.indexed)
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed_params().count()
    }
}

/// A declared function. Kept for selector lookup and schema listings; logs
/// never reference functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    /// Canonical signature, e.g. `transfer(address,uint256)`
    pub signature: String,
    pub selector: [u8; 4],
    pub inputs: Vec<ParameterDescriptor>,
    pub outputs: Vec<ParameterDescriptor>,
    pub state_mutability: Option<String>,
}

impl FunctionDescriptor {
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<ParameterDescriptor>,
        outputs: Vec<ParameterDescriptor>,
        state_mutability: Option<String>,
    ) -> Self {
        let name = name.into();
        let signature =
            signature::canonical_signature(&name, inputs.iter().map(|p| p.ty.as_str()));
        let selector = signature::function_selector(&signature);
        Self {
            name,
            signature,
            selector,
            inputs,
            outputs,
            state_mutability,
        }
    }
}

/// The registry of one contract interface.
#[derive(Debug, Clone, Default)]
pub struct InterfaceSchema {
    events: IndexMap<String, EventDescriptor>,
    by_signature: HashMap<B256, usize>,
    functions: Vec<FunctionDescriptor>,
}

impl InterfaceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event. Event names are unique within a schema.
    pub fn add_event(&mut self, event: EventDescriptor) -> Result<(), SchemaParseError> {
        if self.events.contains_key(&event.name) {
            return Err(SchemaParseError::DuplicateEvent { name: event.name });
        }
        let hash = event.signature_hash;
        let anonymous = event.anonymous;
        let (position, _) = self.events.insert_full(event.name.clone(), event);
        if !anonymous {
            self.by_signature.insert(hash, position);
        }
        Ok(())
    }

    /// Register a function. Overloads are allowed.
    pub fn add_function(&mut self, function: FunctionDescriptor) {
        self.functions.push(function);
    }

    /// Look up an event by name.
    pub fn event(&self, name: &str) -> Option<&EventDescriptor> {
        self.events.get(name)
    }

    /// Look up a non-anonymous event by its `topics[0]` value.
    pub fn event_by_signature(&self, hash: &B256) -> Option<&EventDescriptor> {
        self.by_signature
            .get(hash)
            .and_then(|&i| self.events.get_index(i))
            .map(|(_, e)| e)
    }

    /// Events in declaration order.
    pub fn events(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.events.values()
    }

    pub fn functions(&self) -> &[FunctionDescriptor] {
        &self.functions
    }

    pub fn function_by_selector(&self, selector: [u8; 4]) -> Option<&FunctionDescriptor> {
        self.functions.iter().find(|f| f.selector == selector)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.functions.is_empty()
    }
}
