//! Backup repository - crash-safe snapshot directories
//!
//! On-disk layout under the repository root:
//!
//! ```text
//! <root>/snapshots/<id>/collection.anki2   payload
//! <root>/snapshots/<id>/metadata.json      sidecar
//! <root>/snapshots/.tmp-<id>/              staging (invisible)
//! <root>/state/                            pointer, lock, embedded db
//! ```
//!
//! A snapshot becomes visible through exactly one atomic rename of its
//! staging directory into the snapshot namespace. Enumeration skips
//! dot-prefixed names, so a crash before commit leaves only an orphaned
//! staging directory that the startup sweep removes. A metadata row is
//! only ever written after the rename, which is what keeps "row exists"
//! equivalent to "directory is complete".

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::atomic::{fsync_dir, rename_durable, write_durable};
use crate::errors::{io_error, Result, VaultError};
use crate::sidecar::SnapshotSidecar;

const PAYLOAD_FILE: &str = "collection.anki2";
const SIDECAR_FILE: &str = "metadata.json";
const STAGING_PREFIX: &str = ".tmp-";

#[derive(Debug, Clone)]
pub struct BackupRepository {
    root: PathBuf,
}

/// Handle to a not-yet-visible snapshot directory.
///
/// Consumed by [`BackupRepository::commit`] or
/// [`BackupRepository::discard`]; nothing else can make it visible.
#[derive(Debug)]
pub struct StagingHandle {
    id: String,
    dir: PathBuf,
}

impl StagingHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn payload_path(&self) -> PathBuf {
        self.dir.join(PAYLOAD_FILE)
    }
}

impl BackupRepository {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("snapshots")).map_err(|e| io_error("create_snapshots_dir", e))?;
        fs::create_dir_all(root.join("state")).map_err(|e| io_error("create_state_dir", e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.root.join("snapshots")
    }

    fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.snapshots_dir().join(id)
    }

    /// Repository-relative path recorded in the metadata row
    pub fn storage_path(&self, id: &str) -> String {
        format!("snapshots/{id}")
    }

    pub fn payload_path(&self, id: &str) -> PathBuf {
        self.snapshot_dir(id).join(PAYLOAD_FILE)
    }

    /// True if a committed directory with this id exists
    pub fn exists(&self, id: &str) -> bool {
        self.snapshot_dir(id).is_dir()
    }

    /// Allocate a staging directory for a new snapshot.
    ///
    /// The dot-prefixed name keeps it outside the enumerable namespace
    /// until commit.
    pub fn stage(&self, id: &str) -> Result<StagingHandle> {
        let dir = self.snapshots_dir().join(format!("{STAGING_PREFIX}{id}"));
        if dir.exists() {
            // Leftover from an interrupted run with the same id
            fs::remove_dir_all(&dir).map_err(|e| io_error("clear_stale_staging", e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| io_error("create_staging_dir", e))?;
        Ok(StagingHandle {
            id: id.to_string(),
            dir,
        })
    }

    /// Write the collection payload into a staging directory; returns its size
    pub fn write_payload(&self, handle: &StagingHandle, bytes: &[u8]) -> Result<i64> {
        write_durable(&handle.payload_path(), bytes)?;
        Ok(bytes.len() as i64)
    }

    /// Write the sidecar metadata file into a staging directory
    pub fn write_sidecar(&self, handle: &StagingHandle, sidecar: &SnapshotSidecar) -> Result<()> {
        let json = serde_json::to_vec_pretty(sidecar)
            .map_err(|e| VaultError::serialization("write_sidecar", e.to_string()))?;
        write_durable(&handle.dir.join(SIDECAR_FILE), &json)
    }

    /// Make a staged snapshot visible.
    ///
    /// Flushes the staging directory, then renames it into the snapshot
    /// namespace. Only after the rename succeeds can directory listing
    /// discover the snapshot; a crash before it leaves an orphan that
    /// [`BackupRepository::sweep_staging`] removes.
    pub fn commit(&self, handle: StagingHandle) -> Result<PathBuf> {
        fsync_dir(&handle.dir)?;
        let target = self.snapshot_dir(&handle.id);
        if target.exists() {
            return Err(VaultError::Conflict {
                snapshot_id: handle.id,
            });
        }
        rename_durable(&handle.dir, &target)?;
        tracing::debug!(snapshot_id = %handle.id, "committed snapshot directory");
        Ok(target)
    }

    /// Remove a staging directory after a failed run. Best effort.
    pub fn discard(&self, handle: StagingHandle) {
        if let Err(e) = fs::remove_dir_all(&handle.dir) {
            tracing::warn!(snapshot_id = %handle.id, error = %e, "failed to discard staging dir");
        }
    }

    /// Open a committed snapshot's payload for streaming
    pub fn read(&self, id: &str) -> Result<fs::File> {
        let path = self.payload_path(id);
        if !path.exists() {
            return Err(VaultError::NotFound {
                snapshot_id: id.to_string(),
            });
        }
        fs::File::open(&path).map_err(|e| io_error("open_payload", e))
    }

    /// Verify that a committed snapshot can produce its payload.
    ///
    /// Used by rollback to distinguish `Corrupt` (row present, payload
    /// missing or unreadable) from `NotFound`.
    pub fn verify(&self, id: &str) -> Result<()> {
        let path = self.payload_path(id);
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(VaultError::Corrupt {
                snapshot_id: id.to_string(),
                reason: "payload is not a regular file".to_string(),
            }),
            Err(e) => Err(VaultError::Corrupt {
                snapshot_id: id.to_string(),
                reason: format!("payload unreadable: {e}"),
            }),
        }
    }

    /// Delete a committed snapshot directory.
    ///
    /// The caller must have already deleted the metadata row; the delete
    /// ordering biases partial failure toward a lingering directory that
    /// the unindexed sweep picks up later.
    pub fn delete(&self, id: &str) -> Result<()> {
        let dir = self.snapshot_dir(id);
        if !dir.exists() {
            return Ok(());
        }
        fs::remove_dir_all(&dir).map_err(|e| io_error("delete_snapshot_dir", e))
    }

    /// Rename a committed snapshot directory, for id disambiguation retry.
    ///
    /// Returns the new repository-relative storage path.
    pub fn rename(&self, old_id: &str, new_id: &str) -> Result<String> {
        rename_durable(&self.snapshot_dir(old_id), &self.snapshot_dir(new_id))?;
        Ok(self.storage_path(new_id))
    }

    /// List committed snapshot ids. Staging directories are excluded.
    pub fn list_committed(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let entries =
            fs::read_dir(self.snapshots_dir()).map_err(|e| io_error("list_snapshots_dir", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error("list_snapshots_dir", e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            if entry.path().is_dir() {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Read the sidecar of a committed snapshot
    pub fn read_sidecar(&self, id: &str) -> Result<SnapshotSidecar> {
        let path = self.snapshot_dir(id).join(SIDECAR_FILE);
        let raw = fs::read(&path).map_err(|e| {
            VaultError::Corrupt {
                snapshot_id: id.to_string(),
                reason: format!("sidecar unreadable: {e}"),
            }
        })?;
        serde_json::from_slice(&raw).map_err(|e| VaultError::Corrupt {
            snapshot_id: id.to_string(),
            reason: format!("sidecar invalid: {e}"),
        })
    }

    /// Remove orphaned staging directories left by a crashed run.
    ///
    /// Returns how many were removed.
    pub fn sweep_staging(&self) -> Result<usize> {
        let mut removed = 0;
        let entries =
            fs::read_dir(self.snapshots_dir()).map_err(|e| io_error("sweep_staging", e))?;
        for entry in entries {
            let entry = entry.map_err(|e| io_error("sweep_staging", e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with(STAGING_PREFIX) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => {
                    tracing::info!(staging = %name, "swept orphaned staging directory");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(staging = %name, error = %e, "failed to sweep staging directory");
                }
            }
        }
        Ok(removed)
    }

    /// Remove committed directories that have no metadata row.
    ///
    /// Counterpart of the row-before-directory delete ordering: a prune
    /// that died between the two leaves a rowless directory, which this
    /// sweep deletes. The operator-driven rebuild procedure is the
    /// inverse and must run instead of this when recovering a lost store.
    pub fn sweep_unindexed(&self, known_ids: &HashSet<String>) -> Result<usize> {
        let mut removed = 0;
        for id in self.list_committed()? {
            if known_ids.contains(&id) {
                continue;
            }
            match fs::remove_dir_all(self.snapshot_dir(&id)) {
                Ok(()) => {
                    tracing::info!(snapshot_id = %id, "swept snapshot directory with no metadata row");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(snapshot_id = %id, error = %e, "failed to sweep unindexed directory");
                }
            }
        }
        Ok(removed)
    }
}
