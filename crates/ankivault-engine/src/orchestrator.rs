//! Orchestrator - the backup/rollback state machine
//!
//! Each tick runs refresh → fingerprint → compare → (skip | stage →
//! commit → record) → prune under the run lock; rollback runs resolve →
//! pointer swap → record under the same lock. Every tick appends exactly
//! one run record and every rollback attempt appends exactly one event,
//! whatever the outcome. A failed tick is recorded and swallowed; the
//! daemon never exits because of one.
//!
//! Ordering invariants enforced here:
//! - staging precedes commit precedes metadata insertion precedes
//!   prune-eligibility
//! - the active pointer is only ever set to an id that already has a
//!   metadata row
//! - pruning deletes the metadata row before the directory and never
//!   touches the pointer target

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ankivault_core::model::run::{RunOutcome, SkipReason};
use ankivault_core::model::snapshot::{disambiguated, timestamp_id};
use ankivault_core::{
    fingerprint, Result, RollbackEvent, RunRecord, SnapshotRecord, VaultError,
};
use ankivault_store::{ActivePointer, BackupRepository, MetadataStore, RunLock, SnapshotSidecar};
use chrono::{DateTime, Utc};

use crate::collaborators::{SourceRefresher, StatsExtractor};

/// Retention policy applied after each successful or skipped tick
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Snapshots older than this many days are pruned; <= 0 disables
    /// age-based pruning
    pub max_age_days: i64,
    /// Keep at most this many snapshots, newest first; None disables the cap
    pub max_count: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 90,
            max_count: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path of the mutable source collection file
    pub collection_path: PathBuf,
    /// Time budget for the refresh collaborator; exceeding it fails the
    /// run, not the daemon
    pub sync_timeout: Duration,
    pub retention: RetentionPolicy,
}

/// What one tick produced
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Created(SnapshotRecord),
    Skipped(SkipReason),
    Failed { error_kind: String, message: String },
}

/// Counts from the startup recovery sweep
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryReport {
    pub staging_swept: usize,
    pub unindexed_swept: usize,
}

/// Standing health signal plus a summary of current state
#[derive(Debug, Clone)]
pub struct HealthReport {
    /// Set when on-disk state and metadata diverge; requires operator
    /// attention and persists until the process restarts cleanly
    pub corrupt: Option<String>,
    pub last_run: Option<RunRecord>,
    pub snapshot_count: usize,
    pub active_snapshot_id: Option<String>,
}

enum BackupStep {
    Unchanged,
    Created(SnapshotRecord),
}

pub struct Orchestrator {
    repo: BackupRepository,
    store: Arc<dyn MetadataStore>,
    pointer: ActivePointer,
    run_lock: RunLock,
    refresher: Arc<dyn SourceRefresher>,
    stats: Arc<dyn StatsExtractor>,
    config: EngineConfig,
    corrupt: Mutex<Option<String>>,
}

impl Orchestrator {
    pub fn new(
        repo: BackupRepository,
        store: Arc<dyn MetadataStore>,
        refresher: Arc<dyn SourceRefresher>,
        stats: Arc<dyn StatsExtractor>,
        config: EngineConfig,
    ) -> Self {
        let state_dir = repo.state_dir();
        Self {
            repo,
            store,
            pointer: ActivePointer::in_state_dir(&state_dir),
            run_lock: RunLock::in_state_dir(&state_dir),
            refresher,
            stats,
            config,
            corrupt: Mutex::new(None),
        }
    }

    /// One orchestration run: scheduled tick and manual run are identical.
    ///
    /// Never propagates failures; they are recorded as run records and
    /// reported in the returned outcome.
    pub async fn tick(&self) -> TickOutcome {
        let started_at = Utc::now();

        let guard = match self.run_lock.try_acquire() {
            Ok(guard) => guard,
            Err(VaultError::LockHeld) => {
                tracing::info!("run lock held; tick suppressed");
                self.record_run(
                    started_at,
                    RunOutcome::Skipped {
                        reason: SkipReason::LockHeld,
                    },
                )
                .await;
                return TickOutcome::Skipped(SkipReason::LockHeld);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to acquire run lock");
                self.record_run(
                    started_at,
                    RunOutcome::Failed {
                        error_kind: e.code().to_string(),
                    },
                )
                .await;
                return TickOutcome::Failed {
                    error_kind: e.code().to_string(),
                    message: e.to_string(),
                };
            }
        };

        let outcome = match self.run_backup().await {
            Ok(BackupStep::Unchanged) => {
                tracing::info!("source unchanged; backup skipped");
                self.record_run(
                    started_at,
                    RunOutcome::Skipped {
                        reason: SkipReason::Unchanged,
                    },
                )
                .await;
                TickOutcome::Skipped(SkipReason::Unchanged)
            }
            Ok(BackupStep::Created(record)) => {
                tracing::info!(snapshot_id = %record.id, size_bytes = record.size_bytes, "backup created");
                self.record_run(
                    started_at,
                    RunOutcome::Created {
                        snapshot_id: record.id.clone(),
                    },
                )
                .await;
                TickOutcome::Created(record)
            }
            Err(e) => {
                tracing::error!(error = %e, code = e.code(), "backup run failed");
                self.record_run(
                    started_at,
                    RunOutcome::Failed {
                        error_kind: e.code().to_string(),
                    },
                )
                .await;
                TickOutcome::Failed {
                    error_kind: e.code().to_string(),
                    message: e.to_string(),
                }
            }
        };

        drop(guard);
        outcome
    }

    async fn run_backup(&self) -> Result<BackupStep> {
        // Refresh first: a backup is never attempted against
        // stale-unknown data.
        let refresh = match tokio::time::timeout(self.config.sync_timeout, self.refresher.refresh())
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(VaultError::SyncTimeout {
                    timeout_secs: self.config.sync_timeout.as_secs(),
                })
            }
        };

        let bytes = std::fs::read(&self.config.collection_path)
            .map_err(|e| VaultError::storage("read_collection", e))?;
        let content_hash = fingerprint(&bytes, refresh.assets.as_ref());

        // First run always creates; afterwards unchanged content skips.
        if let Some(latest) = self.store.latest_snapshot().await? {
            if latest.content_hash == content_hash {
                return Ok(BackupStep::Unchanged);
            }
        }

        let created_at = Utc::now();
        let base_id = timestamp_id(created_at);
        let mut id = base_id.clone();
        let mut attempt = 2;
        while self.repo.exists(&id) {
            id = disambiguated(&base_id, attempt);
            attempt += 1;
        }

        let handle = self.repo.stage(&id)?;
        let size_bytes = match self.repo.write_payload(&handle, &bytes) {
            Ok(size) => size,
            Err(e) => {
                self.repo.discard(handle);
                return Err(e);
            }
        };

        // Advisory only: extraction failure degrades to stats = null.
        let stats = match self.stats.extract(&handle.payload_path()) {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!(error = %e, "stats extraction failed; storing null stats");
                None
            }
        };

        let sidecar = SnapshotSidecar {
            content_hash: content_hash.clone(),
            created_at,
            size_bytes,
            source_revision: refresh.source_revision.clone(),
            stats: stats.clone(),
        };
        if let Err(e) = self.repo.write_sidecar(&handle, &sidecar) {
            self.repo.discard(handle);
            return Err(e);
        }

        // Once commit begins it runs to completion or failure; a failed
        // rename leaves only staging debris for the startup sweep.
        if let Err(e) = self.repo.commit(handle) {
            let _ = self.repo.sweep_staging();
            return Err(e);
        }

        let mut record = SnapshotRecord {
            id: id.clone(),
            content_hash,
            created_at,
            size_bytes,
            source_revision: refresh.source_revision,
            stats,
            storage_path: self.repo.storage_path(&id),
        };

        // A conflicting row can only come from a writer outside this
        // lock's protection; disambiguate and retry once. A second
        // failure leaves the committed directory for the unindexed sweep.
        match self.store.insert_snapshot(&record).await {
            Ok(()) => {}
            Err(VaultError::Conflict { .. }) => {
                let retry_id = disambiguated(&base_id, attempt);
                tracing::warn!(snapshot_id = %record.id, retry_id = %retry_id, "id conflict on insert; retrying once");
                record.storage_path = self.repo.rename(&record.id, &retry_id)?;
                record.id = retry_id;
                self.store.insert_snapshot(&record).await?;
            }
            Err(e) => return Err(e),
        }

        // Pointer advances only after the row exists.
        self.pointer.set(&record.id)?;

        let pruned = self.prune().await;
        if pruned > 0 {
            tracing::info!(pruned, "retention pruning removed old snapshots");
        }

        Ok(BackupStep::Created(record))
    }

    /// Retention pruning. Deletes the metadata row before the directory,
    /// oldest first, never the active-pointer target. Per-item failures
    /// are logged and do not abort the rest of the list.
    pub async fn prune(&self) -> usize {
        let snapshots = match self.store.list_snapshots().await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                tracing::warn!(error = %e, "prune: failed to list snapshots");
                return 0;
            }
        };
        let pointer_id = match self.pointer.read() {
            Ok(value) => value.map(|p| p.snapshot_id),
            Err(e) => {
                tracing::warn!(error = %e, "prune: failed to read active pointer");
                return 0;
            }
        };

        let cutoff = (self.config.retention.max_age_days > 0)
            .then(|| Utc::now() - chrono::Duration::days(self.config.retention.max_age_days));
        let keep_count = self.config.retention.max_count.unwrap_or(usize::MAX);

        // list_snapshots is newest first; walk the tail oldest-first.
        let doomed: Vec<&SnapshotRecord> = snapshots
            .iter()
            .enumerate()
            .rev()
            .filter(|(index, snapshot)| {
                let too_old = cutoff.is_some_and(|cutoff| snapshot.created_at < cutoff);
                let over_cap = *index >= keep_count;
                (too_old || over_cap) && pointer_id.as_deref() != Some(snapshot.id.as_str())
            })
            .map(|(_, snapshot)| snapshot)
            .collect();

        let mut removed = 0;
        for snapshot in doomed {
            if let Err(e) = self.store.delete_snapshot(&snapshot.id).await {
                tracing::warn!(snapshot_id = %snapshot.id, error = %e, "prune: row delete failed");
                continue;
            }
            if let Err(e) = self.repo.delete(&snapshot.id) {
                // Row is gone; the directory lingers until the unindexed
                // sweep picks it up.
                tracing::warn!(snapshot_id = %snapshot.id, error = %e, "prune: directory delete failed");
                continue;
            }
            tracing::debug!(snapshot_id = %snapshot.id, "pruned snapshot");
            removed += 1;
        }
        removed
    }

    /// Repoint the active pointer to a prior snapshot.
    ///
    /// Blocks until the run lock is free, so a rollback issued during a
    /// tick waits for it rather than interleaving. Every attempt appends
    /// a rollback event. Snapshot rows are never mutated.
    pub async fn rollback(&self, target_id: &str) -> Result<RollbackEvent> {
        let requested_at = Utc::now();
        let lock = self.run_lock.clone();
        let guard = tokio::task::spawn_blocking(move || lock.acquire())
            .await
            .map_err(|e| VaultError::metadata("acquire_run_lock", e.to_string()))??;

        let result = self.rollback_locked(target_id, requested_at).await;
        drop(guard);
        result
    }

    async fn rollback_locked(
        &self,
        target_id: &str,
        requested_at: DateTime<Utc>,
    ) -> Result<RollbackEvent> {
        let previous = self.pointer.read()?.map(|p| p.snapshot_id);

        let resolved = match self.store.get_snapshot(target_id).await? {
            None => Err(VaultError::NotFound {
                snapshot_id: target_id.to_string(),
            }),
            Some(_) => self.repo.verify(target_id),
        };

        if let Err(e) = resolved {
            if let VaultError::Corrupt { .. } = &e {
                self.flag_corrupt(e.to_string());
            }
            let event =
                RollbackEvent::failed(target_id.to_string(), previous, requested_at, e.code());
            if let Err(insert_err) = self.store.insert_rollback_event(&event).await {
                tracing::error!(error = %insert_err, "failed to record rollback event");
            }
            return Err(e);
        }

        if let Err(e) = self.pointer.set(target_id) {
            let event =
                RollbackEvent::failed(target_id.to_string(), previous, requested_at, e.code());
            if let Err(insert_err) = self.store.insert_rollback_event(&event).await {
                tracing::error!(error = %insert_err, "failed to record rollback event");
            }
            return Err(e);
        }

        let event = RollbackEvent::succeeded(target_id.to_string(), previous, requested_at);
        self.store.insert_rollback_event(&event).await?;
        tracing::info!(
            target = %event.target_snapshot_id,
            previous = event.previous_snapshot_id.as_deref().unwrap_or("-"),
            "rollback completed"
        );
        Ok(event)
    }

    /// Startup recovery: sweep staging debris and rowless directories,
    /// then validate the active pointer.
    ///
    /// Must not run when the operator intends to rebuild a lost metadata
    /// store from disk; `rebuild_metadata` is the inverse procedure.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let staging_swept = self.repo.sweep_staging()?;
        let known: HashSet<String> = self
            .store
            .list_snapshots()
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let unindexed_swept = self.repo.sweep_unindexed(&known)?;

        if let Some(pointer) = self.pointer.read()? {
            let resolvable =
                known.contains(&pointer.snapshot_id) && self.repo.verify(&pointer.snapshot_id).is_ok();
            if !resolvable {
                self.flag_corrupt(format!(
                    "active pointer references {}, which is missing or unreadable",
                    pointer.snapshot_id
                ));
            }
        }

        Ok(RecoveryReport {
            staging_swept,
            unindexed_swept,
        })
    }

    /// Reconstruct missing metadata rows from snapshot sidecars.
    ///
    /// Snapshot directories are the durable source of truth; the store is
    /// an index over them. Returns how many rows were restored.
    pub async fn rebuild_metadata(&self) -> Result<usize> {
        let lock = self.run_lock.clone();
        let guard = tokio::task::spawn_blocking(move || lock.acquire())
            .await
            .map_err(|e| VaultError::metadata("acquire_run_lock", e.to_string()))??;

        let mut restored = 0;
        for id in self.repo.list_committed()? {
            if self.store.get_snapshot(&id).await?.is_some() {
                continue;
            }
            let sidecar = match self.repo.read_sidecar(&id) {
                Ok(sidecar) => sidecar,
                Err(e) => {
                    tracing::warn!(snapshot_id = %id, error = %e, "rebuild: unreadable sidecar, skipping");
                    continue;
                }
            };
            let record = sidecar.into_record(&id, self.repo.storage_path(&id));
            self.store.insert_snapshot(&record).await?;
            tracing::info!(snapshot_id = %id, "rebuild: restored metadata row");
            restored += 1;
        }

        drop(guard);
        Ok(restored)
    }

    /// Standing health signal plus a summary of current state.
    ///
    /// Read-only; never takes the run lock. Re-validates the active
    /// pointer so metadata/disk divergence shows up even in a process
    /// that never witnessed the failing rollback.
    pub async fn health(&self) -> Result<HealthReport> {
        let active = self.pointer.read()?.map(|p| p.snapshot_id);
        if let Some(id) = &active {
            let resolvable =
                self.store.get_snapshot(id).await?.is_some() && self.repo.verify(id).is_ok();
            if !resolvable {
                self.flag_corrupt(format!(
                    "active pointer references {id}, which is missing or unreadable"
                ));
            }
        }
        let last_run = self.store.latest_run().await?;
        let snapshot_count = self.store.list_snapshots().await?.len();
        let corrupt = self.corrupt.lock().expect("corrupt flag lock").clone();
        Ok(HealthReport {
            corrupt,
            last_run,
            snapshot_count,
            active_snapshot_id: active,
        })
    }

    // Read-only consumer surface; proceeds concurrently with a tick and
    // observes only committed state.

    pub async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.store.list_snapshots().await
    }

    pub async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>> {
        self.store.get_snapshot(id).await
    }

    /// Streaming handle to a committed snapshot's payload
    pub fn open_payload(&self, id: &str) -> Result<std::fs::File> {
        self.repo.read(id)
    }

    pub fn active_snapshot_id(&self) -> Result<Option<String>> {
        Ok(self.pointer.read()?.map(|p| p.snapshot_id))
    }

    pub async fn list_runs(&self) -> Result<Vec<RunRecord>> {
        self.store.list_runs().await
    }

    pub async fn list_rollback_events(&self) -> Result<Vec<RollbackEvent>> {
        self.store.list_rollback_events().await
    }

    pub async fn latest_run(&self) -> Result<Option<RunRecord>> {
        self.store.latest_run().await
    }

    fn flag_corrupt(&self, detail: String) {
        tracing::error!(detail = %detail, "on-disk state and metadata diverge");
        let mut corrupt = self.corrupt.lock().expect("corrupt flag lock");
        if corrupt.is_none() {
            *corrupt = Some(detail);
        }
    }

    async fn record_run(&self, started_at: DateTime<Utc>, outcome: RunOutcome) {
        let record = RunRecord {
            outcome,
            started_at,
            finished_at: Utc::now(),
        };
        if let Err(e) = self.store.insert_run(&record).await {
            tracing::error!(error = %e, "failed to append run record");
        }
    }
}
