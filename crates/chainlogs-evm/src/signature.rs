//! Event signature hashing and function selectors.
//!
//! The signature hash of an EVM event is the keccak256 hash of its canonical
//! signature string, e.g.:
//!   keccak256("Transfer(address,address,uint256)")
//!   → 0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef
//!
//! The node writes exactly this value into `topics[0]`, so any deviation here
//! silently breaks every downstream match.

use alloy_primitives::B256;
use tiny_keccak::{Hasher, Keccak};

/// keccak256 of arbitrary bytes.
pub fn keccak256(bytes: &[u8]) -> B256 {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(bytes);
    hasher.finalize(&mut output);
    B256::from(output)
}

/// Hash of a canonical event signature, `"Name(type1,type2,...)"`.
pub fn event_signature_hash(signature: &str) -> B256 {
    keccak256(signature.as_bytes())
}

/// 4-byte selector of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash[..4]);
    selector
}

/// Build a canonical signature from a name and canonical type names.
pub fn canonical_signature<'a>(name: &str, types: impl IntoIterator<Item = &'a str>) -> String {
    let types: Vec<&str> = types.into_iter().collect();
    format!("{name}({})", types.join(","))
}
