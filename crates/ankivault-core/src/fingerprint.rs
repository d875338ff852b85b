//! Content fingerprinting for change detection
//!
//! A backup run is skipped when the freshly synced collection hashes to
//! the same fingerprint as the latest snapshot. The digest covers the raw
//! collection bytes plus an optional manifest of auxiliary assets.
//!
//! ## Manifest policy
//!
//! Manifest entries are hashed **in the order given**; there is no
//! canonicalization step. Two manifests with the same entries in a
//! different order therefore produce different fingerprints. Callers that
//! want order-insensitive behaviour must sort before handing the manifest
//! over.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One auxiliary asset accompanying the collection (e.g. a media file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// Ordered manifest of auxiliary assets
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub entries: Vec<AssetEntry>,
}

/// Compute the deterministic SHA-256 fingerprint of a collection.
///
/// Deterministic under byte-identical input; order-sensitive with respect
/// to the manifest (see module docs). Fields are length-prefixed so that
/// adjacent entries can never alias each other.
pub fn fingerprint(collection: &[u8], manifest: Option<&AssetManifest>) -> String {
    let mut hasher = Sha256::new();
    hasher.update((collection.len() as u64).to_le_bytes());
    hasher.update(collection);
    if let Some(manifest) = manifest {
        for entry in &manifest.entries {
            hasher.update((entry.name.len() as u64).to_le_bytes());
            hasher.update(entry.name.as_bytes());
            hasher.update(entry.size_bytes.to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_for_same_content() {
        let data = b"collection-bytes";
        assert_eq!(fingerprint(data, None), fingerprint(data, None));
    }

    #[test]
    fn test_fingerprint_changes_when_content_changes() {
        assert_ne!(fingerprint(b"v1", None), fingerprint(b"v2", None));
    }

    #[test]
    fn test_manifest_order_matters() {
        let a = AssetEntry {
            name: "a.jpg".into(),
            size_bytes: 10,
        };
        let b = AssetEntry {
            name: "b.jpg".into(),
            size_bytes: 20,
        };
        let forward = AssetManifest {
            entries: vec![a.clone(), b.clone()],
        };
        let reverse = AssetManifest {
            entries: vec![b, a],
        };
        assert_ne!(
            fingerprint(b"col", Some(&forward)),
            fingerprint(b"col", Some(&reverse))
        );
    }

    #[test]
    fn test_empty_manifest_differs_from_no_manifest() {
        // Same bytes either way; the length prefix keeps the digest equal
        // only when the manifest contributes nothing.
        let empty = AssetManifest::default();
        assert_eq!(fingerprint(b"col", None), fingerprint(b"col", Some(&empty)));
    }

    #[test]
    fn test_fingerprint_is_64_hex_chars() {
        assert_eq!(fingerprint(b"x", None).len(), 64);
    }
}
