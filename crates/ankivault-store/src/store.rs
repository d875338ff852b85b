//! Metadata store capability trait
//!
//! The single source of truth for which snapshots exist, plus the
//! append-only audit logs. Implemented by the embedded SQLite backend and
//! the networked Postgres backend; the orchestrator depends only on this
//! contract, never on backend transaction semantics beyond the
//! row-before-directory delete ordering.

use ankivault_core::{Result, RollbackEvent, RunRecord, SnapshotRecord};

#[async_trait::async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert a snapshot row. Fails with `Conflict` if the id exists.
    async fn insert_snapshot(&self, record: &SnapshotRecord) -> Result<()>;

    /// Get a single snapshot by id
    async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>>;

    /// All snapshots, newest first (created_at DESC, id DESC)
    async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>>;

    /// Comparison point for change detection: newest by created_at, id as
    /// tiebreak
    async fn latest_snapshot(&self) -> Result<Option<SnapshotRecord>>;

    /// Delete a snapshot row. Used only by pruning, which must delete the
    /// row before the directory. Idempotent.
    async fn delete_snapshot(&self, id: &str) -> Result<()>;

    /// Append a run record
    async fn insert_run(&self, record: &RunRecord) -> Result<()>;

    /// All run records, oldest first
    async fn list_runs(&self) -> Result<Vec<RunRecord>>;

    /// Most recently started run, if any (drives scheduler catch-up)
    async fn latest_run(&self) -> Result<Option<RunRecord>>;

    /// Append a rollback event
    async fn insert_rollback_event(&self, event: &RollbackEvent) -> Result<()>;

    /// All rollback events, oldest first
    async fn list_rollback_events(&self) -> Result<Vec<RollbackEvent>>;
}
