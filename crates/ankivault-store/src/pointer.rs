//! Active pointer - the single reference naming the live snapshot
//!
//! A small JSON file updated only via atomic replace. Before the rename
//! any crash leaves the old value intact; after it, the new value. The
//! swap is the linearization point of a rollback.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::atomic::atomic_replace;
use crate::errors::{Result, VaultError};

const POINTER_FILE: &str = "active-pointer.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerValue {
    pub snapshot_id: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ActivePointer {
    path: PathBuf,
}

impl ActivePointer {
    /// Pointer file inside a repository state directory
    pub fn in_state_dir(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(POINTER_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current pointer value; None while unset (before the first backup)
    pub fn read(&self) -> Result<Option<PointerValue>> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(VaultError::storage("read_pointer", e)),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| VaultError::serialization("read_pointer", e.to_string()))
    }

    /// Repoint to a snapshot id via atomic replace
    pub fn set(&self, snapshot_id: &str) -> Result<()> {
        let value = PointerValue {
            snapshot_id: snapshot_id.to_string(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_vec_pretty(&value)
            .map_err(|e| VaultError::serialization("write_pointer", e.to_string()))?;
        atomic_replace(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_unset_pointer_reads_none() {
        let tmp = TempDir::new().unwrap();
        let pointer = ActivePointer::in_state_dir(tmp.path());
        assert!(pointer.read().unwrap().is_none());
    }

    #[test]
    fn test_set_then_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let pointer = ActivePointer::in_state_dir(tmp.path());

        pointer.set("2026-01-01T00-00-00Z").unwrap();
        let value = pointer.read().unwrap().unwrap();
        assert_eq!(value.snapshot_id, "2026-01-01T00-00-00Z");
    }

    #[test]
    fn test_set_replaces_previous_value() {
        let tmp = TempDir::new().unwrap();
        let pointer = ActivePointer::in_state_dir(tmp.path());

        pointer.set("first").unwrap();
        pointer.set("second").unwrap();
        assert_eq!(pointer.read().unwrap().unwrap().snapshot_id, "second");
    }
}
