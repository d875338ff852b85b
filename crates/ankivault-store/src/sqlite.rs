//! SQLite-backed metadata store
//!
//! The embedded default backend. Each method opens a fresh connection and
//! runs on the blocking pool; WAL journaling lets read-only API queries
//! proceed while a tick writes.

use std::path::PathBuf;

use ankivault_core::model::run::{RunOutcome, SkipReason};
use ankivault_core::{RollbackEvent, RunRecord, SnapshotRecord};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db;
use crate::errors::{from_rusqlite, join_error, Result, VaultError};
use crate::migrations::apply_migrations;
use crate::store::MetadataStore;

pub struct SqliteStore {
    db_path: PathBuf,
}

impl SqliteStore {
    /// Open (creating if needed) the metadata database and apply migrations
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let mut conn = db::open(&db_path)?;
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { db_path })
    }

    async fn blocking<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Connection) -> Result<T> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db::open(&db_path)?;
            f(conn)
        })
        .await
        .map_err(|e| join_error(op, e))?
    }
}

const SNAPSHOT_COLUMNS: &str =
    "id, content_hash, created_at, size_bytes, source_revision, stats_json, storage_path";

#[async_trait::async_trait]
impl MetadataStore for SqliteStore {
    async fn insert_snapshot(&self, record: &SnapshotRecord) -> Result<()> {
        let record = record.clone();
        self.blocking("insert_snapshot", move |conn| {
            let stats_json = record
                .stats
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(|e| VaultError::serialization("insert_snapshot", e.to_string()))?;
            let result = conn.execute(
                "INSERT INTO snapshots (id, content_hash, created_at, size_bytes,
                 source_revision, stats_json, storage_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id,
                    record.content_hash,
                    record.created_at.to_rfc3339(),
                    record.size_bytes,
                    record.source_revision,
                    stats_json,
                    record.storage_path,
                ],
            );
            match result {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(VaultError::Conflict {
                        snapshot_id: record.id.clone(),
                    })
                }
                Err(e) => Err(from_rusqlite("insert_snapshot", e)),
            }
        })
        .await
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>> {
        let id = id.to_string();
        self.blocking("get_snapshot", move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE id = ?1"
                ))
                .map_err(|e| from_rusqlite("get_snapshot", e))?;
            stmt.query_row([id], row_to_snapshot)
                .optional()
                .map_err(|e| from_rusqlite("get_snapshot", e))
        })
        .await
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.blocking("list_snapshots", move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
                     ORDER BY created_at DESC, id DESC"
                ))
                .map_err(|e| from_rusqlite("list_snapshots", e))?;
            let rows = stmt
                .query_map([], row_to_snapshot)
                .map_err(|e| from_rusqlite("list_snapshots", e))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| from_rusqlite("list_snapshots", e))
        })
        .await
    }

    async fn latest_snapshot(&self) -> Result<Option<SnapshotRecord>> {
        self.blocking("latest_snapshot", move |conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SNAPSHOT_COLUMNS} FROM snapshots
                     ORDER BY created_at DESC, id DESC LIMIT 1"
                ))
                .map_err(|e| from_rusqlite("latest_snapshot", e))?;
            stmt.query_row([], row_to_snapshot)
                .optional()
                .map_err(|e| from_rusqlite("latest_snapshot", e))
        })
        .await
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.blocking("delete_snapshot", move |conn| {
            conn.execute("DELETE FROM snapshots WHERE id = ?1", [id])
                .map_err(|e| from_rusqlite("delete_snapshot", e))?;
            Ok(())
        })
        .await
    }

    async fn insert_run(&self, record: &RunRecord) -> Result<()> {
        let record = record.clone();
        self.blocking("insert_run", move |conn| {
            conn.execute(
                "INSERT INTO run_records (outcome, snapshot_id, detail, started_at, finished_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.outcome.as_str(),
                    record.outcome.snapshot_id(),
                    record.outcome.detail(),
                    record.started_at.to_rfc3339(),
                    record.finished_at.to_rfc3339(),
                ],
            )
            .map_err(|e| from_rusqlite("insert_run", e))?;
            Ok(())
        })
        .await
    }

    async fn list_runs(&self) -> Result<Vec<RunRecord>> {
        self.blocking("list_runs", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT outcome, snapshot_id, detail, started_at, finished_at
                     FROM run_records ORDER BY id ASC",
                )
                .map_err(|e| from_rusqlite("list_runs", e))?;
            let rows = stmt
                .query_map([], row_to_run)
                .map_err(|e| from_rusqlite("list_runs", e))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| from_rusqlite("list_runs", e))
        })
        .await
    }

    async fn latest_run(&self) -> Result<Option<RunRecord>> {
        self.blocking("latest_run", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT outcome, snapshot_id, detail, started_at, finished_at
                     FROM run_records ORDER BY id DESC LIMIT 1",
                )
                .map_err(|e| from_rusqlite("latest_run", e))?;
            stmt.query_row([], row_to_run)
                .optional()
                .map_err(|e| from_rusqlite("latest_run", e))
        })
        .await
    }

    async fn insert_rollback_event(&self, event: &RollbackEvent) -> Result<()> {
        let event = event.clone();
        self.blocking("insert_rollback_event", move |conn| {
            conn.execute(
                "INSERT INTO rollback_events
                 (id, target_snapshot_id, previous_snapshot_id, requested_at, result)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.id,
                    event.target_snapshot_id,
                    event.previous_snapshot_id,
                    event.requested_at.to_rfc3339(),
                    event.result,
                ],
            )
            .map_err(|e| from_rusqlite("insert_rollback_event", e))?;
            Ok(())
        })
        .await
    }

    async fn list_rollback_events(&self) -> Result<Vec<RollbackEvent>> {
        self.blocking("list_rollback_events", move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, target_snapshot_id, previous_snapshot_id, requested_at, result
                     FROM rollback_events ORDER BY requested_at ASC, id ASC",
                )
                .map_err(|e| from_rusqlite("list_rollback_events", e))?;
            let rows = stmt
                .query_map([], row_to_event)
                .map_err(|e| from_rusqlite("list_rollback_events", e))?;
            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| from_rusqlite("list_rollback_events", e))
        })
        .await
    }
}

fn row_to_snapshot(row: &rusqlite::Row) -> rusqlite::Result<SnapshotRecord> {
    let stats_json: Option<String> = row.get(5)?;
    Ok(SnapshotRecord {
        id: row.get(0)?,
        content_hash: row.get(1)?,
        created_at: parse_ts(row.get::<_, String>(2)?, 2)?,
        size_bytes: row.get(3)?,
        source_revision: row.get(4)?,
        stats: stats_json
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| conversion_err(5, e))?,
        storage_path: row.get(6)?,
    })
}

fn row_to_run(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
    let outcome_s: String = row.get(0)?;
    let snapshot_id: Option<String> = row.get(1)?;
    let detail: Option<String> = row.get(2)?;

    let outcome = match outcome_s.as_str() {
        "created" => RunOutcome::Created {
            snapshot_id: snapshot_id.unwrap_or_default(),
        },
        "skipped" => RunOutcome::Skipped {
            reason: detail
                .as_deref()
                .and_then(SkipReason::parse)
                .unwrap_or(SkipReason::Unchanged),
        },
        _ => RunOutcome::Failed {
            error_kind: detail.unwrap_or_else(|| "ERR_METADATA_FAILURE".to_string()),
        },
    };

    Ok(RunRecord {
        outcome,
        started_at: parse_ts(row.get::<_, String>(3)?, 3)?,
        finished_at: parse_ts(row.get::<_, String>(4)?, 4)?,
    })
}

fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<RollbackEvent> {
    Ok(RollbackEvent {
        id: row.get(0)?,
        target_snapshot_id: row.get(1)?,
        previous_snapshot_id: row.get(2)?,
        requested_at: parse_ts(row.get::<_, String>(3)?, 3)?,
        result: row.get(4)?,
    })
}

fn parse_ts(raw: String, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}
