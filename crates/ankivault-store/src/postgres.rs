//! Postgres-backed metadata store
//!
//! Drop-in networked alternative to the embedded SQLite backend. Same
//! contract, same ordering guarantees; schema is applied at construction.

use ankivault_core::model::run::{RunOutcome, SkipReason};
use ankivault_core::{RollbackEvent, RunRecord, SnapshotRecord};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::errors::{from_sqlx, Result, VaultError};
use crate::store::MetadataStore;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| from_sqlx("connect", e))?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS snapshots (
                id TEXT PRIMARY KEY,
                content_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                size_bytes BIGINT NOT NULL DEFAULT 0,
                source_revision TEXT,
                stats_json TEXT,
                storage_path TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| from_sqlx("create_snapshots_table", e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS run_records (
                id BIGSERIAL PRIMARY KEY,
                outcome TEXT NOT NULL,
                snapshot_id TEXT,
                detail TEXT,
                started_at TIMESTAMPTZ NOT NULL,
                finished_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| from_sqlx("create_run_records_table", e))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rollback_events (
                id TEXT PRIMARY KEY,
                target_snapshot_id TEXT NOT NULL,
                previous_snapshot_id TEXT,
                requested_at TIMESTAMPTZ NOT NULL,
                result TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| from_sqlx("create_rollback_events_table", e))?;

        Ok(())
    }
}

const SNAPSHOT_COLUMNS: &str =
    "id, content_hash, created_at, size_bytes, source_revision, stats_json, storage_path";

#[async_trait::async_trait]
impl MetadataStore for PostgresStore {
    async fn insert_snapshot(&self, record: &SnapshotRecord) -> Result<()> {
        let stats_json = record
            .stats
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| VaultError::serialization("insert_snapshot", e.to_string()))?;
        let result = sqlx::query(
            "INSERT INTO snapshots (id, content_hash, created_at, size_bytes,
             source_revision, stats_json, storage_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&record.id)
        .bind(&record.content_hash)
        .bind(record.created_at)
        .bind(record.size_bytes)
        .bind(&record.source_revision)
        .bind(stats_json)
        .bind(&record.storage_path)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(VaultError::Conflict {
                    snapshot_id: record.id.clone(),
                })
            }
            Err(e) => Err(from_sqlx("insert_snapshot", e)),
        }
    }

    async fn get_snapshot(&self, id: &str) -> Result<Option<SnapshotRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| from_sqlx("get_snapshot", e))?;

        row.map(|r| pg_row_to_snapshot(&r)).transpose()
    }

    async fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| from_sqlx("list_snapshots", e))?;

        rows.iter().map(pg_row_to_snapshot).collect()
    }

    async fn latest_snapshot(&self) -> Result<Option<SnapshotRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SNAPSHOT_COLUMNS} FROM snapshots ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| from_sqlx("latest_snapshot", e))?;

        row.map(|r| pg_row_to_snapshot(&r)).transpose()
    }

    async fn delete_snapshot(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM snapshots WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| from_sqlx("delete_snapshot", e))?;
        Ok(())
    }

    async fn insert_run(&self, record: &RunRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO run_records (outcome, snapshot_id, detail, started_at, finished_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(record.outcome.as_str())
        .bind(record.outcome.snapshot_id())
        .bind(record.outcome.detail())
        .bind(record.started_at)
        .bind(record.finished_at)
        .execute(&self.pool)
        .await
        .map_err(|e| from_sqlx("insert_run", e))?;
        Ok(())
    }

    async fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let rows = sqlx::query(
            "SELECT outcome, snapshot_id, detail, started_at, finished_at
             FROM run_records ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| from_sqlx("list_runs", e))?;

        rows.iter().map(pg_row_to_run).collect()
    }

    async fn latest_run(&self) -> Result<Option<RunRecord>> {
        let row = sqlx::query(
            "SELECT outcome, snapshot_id, detail, started_at, finished_at
             FROM run_records ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| from_sqlx("latest_run", e))?;

        row.map(|r| pg_row_to_run(&r)).transpose()
    }

    async fn insert_rollback_event(&self, event: &RollbackEvent) -> Result<()> {
        sqlx::query(
            "INSERT INTO rollback_events
             (id, target_snapshot_id, previous_snapshot_id, requested_at, result)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&event.id)
        .bind(&event.target_snapshot_id)
        .bind(&event.previous_snapshot_id)
        .bind(event.requested_at)
        .bind(&event.result)
        .execute(&self.pool)
        .await
        .map_err(|e| from_sqlx("insert_rollback_event", e))?;
        Ok(())
    }

    async fn list_rollback_events(&self) -> Result<Vec<RollbackEvent>> {
        let rows = sqlx::query(
            "SELECT id, target_snapshot_id, previous_snapshot_id, requested_at, result
             FROM rollback_events ORDER BY requested_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| from_sqlx("list_rollback_events", e))?;

        rows.iter()
            .map(|r| {
                Ok(RollbackEvent {
                    id: r.get("id"),
                    target_snapshot_id: r.get("target_snapshot_id"),
                    previous_snapshot_id: r.get("previous_snapshot_id"),
                    requested_at: r.get("requested_at"),
                    result: r.get("result"),
                })
            })
            .collect()
    }
}

fn pg_row_to_snapshot(row: &sqlx::postgres::PgRow) -> Result<SnapshotRecord> {
    let stats_json: Option<String> = row.get("stats_json");
    Ok(SnapshotRecord {
        id: row.get("id"),
        content_hash: row.get("content_hash"),
        created_at: row.get("created_at"),
        size_bytes: row.get("size_bytes"),
        source_revision: row.get("source_revision"),
        stats: stats_json
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(|e| VaultError::serialization("parse_stats_json", e.to_string()))?,
        storage_path: row.get("storage_path"),
    })
}

fn pg_row_to_run(row: &sqlx::postgres::PgRow) -> Result<RunRecord> {
    let outcome_s: String = row.get("outcome");
    let snapshot_id: Option<String> = row.get("snapshot_id");
    let detail: Option<String> = row.get("detail");

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
        started_at: row.get("started_at"),
        finished_at: row.get("finished_at"),
    })
}
