//! Snapshot sidecar metadata
//!
//! Every committed snapshot directory carries a `metadata.json` sidecar
//! with enough information to reconstruct its metadata row. Directories
//! are the durable source of truth; the metadata store is a queryable
//! index over them.

use ankivault_core::{CollectionStats, SnapshotRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSidecar {
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub size_bytes: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_revision: Option<String>,
    #[serde(default)]
    pub stats: Option<CollectionStats>,
}

impl SnapshotSidecar {
    pub fn from_record(record: &SnapshotRecord) -> Self {
        Self {
            content_hash: record.content_hash.clone(),
            created_at: record.created_at,
            size_bytes: record.size_bytes,
            source_revision: record.source_revision.clone(),
            stats: record.stats.clone(),
        }
    }

    /// Reconstruct the metadata row for the snapshot this sidecar sits in
    pub fn into_record(self, id: &str, storage_path: String) -> SnapshotRecord {
        SnapshotRecord {
            id: id.to_string(),
            content_hash: self.content_hash,
            created_at: self.created_at,
            size_bytes: self.size_bytes,
            source_revision: self.source_revision,
            stats: self.stats,
            storage_path,
        }
    }
}
