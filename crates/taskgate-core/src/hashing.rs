// crates/taskgate-core/src/hashing.rs
// ============================================================================
// Module: Taskgate Hashing
// Description: Canonical JSON encoding and content hashing helpers.
// Purpose: Give the derived project database (spec §3.3) a stable staleness
//          fingerprint and give the Run Store a way to detect a rewritten
//          temp file that never completed its rename.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! `canonical_json_bytes` renders any `Serialize` value through [`serde_jcs`]
//! (JSON Canonicalization Scheme), so two equal values always hash the same
//! regardless of field insertion order. `hash_canonical_json` is the single
//! helper the project-database cache and the pattern registry use to compute
//! their staleness fingerprints.

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

/// Errors produced while canonicalizing a value to JSON.
#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    /// The value could not be serialized to canonical JSON.
    #[error("failed to canonicalize value: {0}")]
    Canonicalize(String),
}

/// Renders `value` as canonical (JCS) JSON bytes.
///
/// # Errors
/// Returns [`HashingError::Canonicalize`] if `value`'s `Serialize`
/// implementation fails or produces a non-canonicalizable shape (e.g. `NaN`).
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, HashingError> {
    serde_jcs::to_vec(value).map_err(|err| HashingError::Canonicalize(err.to_string()))
}

/// Computes a lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    digest.iter().map(|byte| format!("{byte:02x}")).collect()
}

/// Computes the canonical-JSON SHA-256 digest of `value`.
///
/// # Errors
/// Returns [`HashingError::Canonicalize`] under the same conditions as
/// [`canonical_json_bytes`].
pub fn hash_canonical_json<T: Serialize>(value: &T) -> Result<String, HashingError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::hash_canonical_json;

    #[test]
    fn field_order_does_not_change_the_hash() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(
            hash_canonical_json(&a).expect("canonicalizes"),
            hash_canonical_json(&b).expect("canonicalizes")
        );
    }

    #[test]
    fn different_values_hash_differently() {
        let a = json!({"a": 1});
        let b = json!({"a": 2});
        assert_ne!(
            hash_canonical_json(&a).expect("canonicalizes"),
            hash_canonical_json(&b).expect("canonicalizes")
        );
    }
}
