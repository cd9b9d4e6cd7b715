//! Converts alloy-core `DynSolValue` → ChainLogs `AbiValue`.

use alloy_core::dyn_abi::DynSolValue;
use chainlogs_core::value::AbiValue;

/// Convert a decoded `DynSolValue` into an `AbiValue`.
pub fn normalize(val: DynSolValue) -> AbiValue {
    match val {
        DynSolValue::Bool(b) => AbiValue::Bool(b),

        DynSolValue::Int(i, _bits) => match i128::try_from(i) {
            Ok(v) => AbiValue::Int(v),
            Err(_) => AbiValue::BigInt(i.to_string()),
        },

        DynSolValue::Uint(u, _bits) => match u128::try_from(u) {
            Ok(v) => AbiValue::Uint(v),
            Err(_) => AbiValue::BigUint(u.to_string()),
        },

        // Only the declared width is meaningful; the rest is padding
        DynSolValue::FixedBytes(word, size) => AbiValue::FixedBytes(word[..size].to_vec()),

        DynSolValue::Bytes(b) => AbiValue::Bytes(b),

        DynSolValue::String(s) => AbiValue::Str(s),

        DynSolValue::Address(a) => AbiValue::Address(a.to_checksum(None)),

        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) => {
            AbiValue::Array(vals.into_iter().map(normalize).collect())
        }

        DynSolValue::Tuple(fields) => AbiValue::Tuple(fields.into_iter().map(normalize).collect()),

        // address ++ selector, 24 bytes
        DynSolValue::Function(f) => AbiValue::FixedBytes(f.to_vec()),
    }
}
