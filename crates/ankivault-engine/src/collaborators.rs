//! External collaborator interfaces
//!
//! The sync mechanism and the stats queries live outside the engine; the
//! orchestrator only sees these traits. Refresh contract: on success the
//! collection file at the configured path reflects the latest upstream
//! state; on failure it is left unchanged and the error is surfaced
//! without interpretation.

use std::path::{Path, PathBuf};

use ankivault_core::{AssetManifest, CollectionStats, DeckStats, Result, VaultError};

/// What a successful refresh reports back
#[derive(Debug, Clone, Default)]
pub struct RefreshOutcome {
    /// Upstream revision marker, if the mechanism exposes one
    pub source_revision: Option<String>,
    /// Ordered manifest of auxiliary assets to fold into the fingerprint
    pub assets: Option<AssetManifest>,
}

/// Refreshes the source collection before a backup is taken
#[async_trait::async_trait]
pub trait SourceRefresher: Send + Sync {
    async fn refresh(&self) -> Result<RefreshOutcome>;
}

/// Runs a configured shell command to refresh the collection.
///
/// The command is expected to leave the refreshed collection at the
/// configured path. Non-zero exit is a sync failure; stderr is folded
/// into the error message.
pub struct CommandRefresher {
    command: String,
}

impl CommandRefresher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait::async_trait]
impl SourceRefresher for CommandRefresher {
    async fn refresh(&self) -> Result<RefreshOutcome> {
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .output()
            .await
            .map_err(|e| VaultError::SyncFailure {
                reason: format!("failed to spawn sync command: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VaultError::SyncFailure {
                reason: format!(
                    "sync command exited with {}: {}",
                    output.status,
                    stderr.trim()
                ),
            });
        }

        tracing::debug!(command = %self.command, "sync command succeeded");
        Ok(RefreshOutcome::default())
    }
}

/// No sync mechanism: the collection file is maintained externally.
///
/// Refresh only checks that the file is present.
pub struct NoopRefresher {
    collection_path: PathBuf,
}

impl NoopRefresher {
    pub fn new(collection_path: impl Into<PathBuf>) -> Self {
        Self {
            collection_path: collection_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl SourceRefresher for NoopRefresher {
    async fn refresh(&self) -> Result<RefreshOutcome> {
        if !self.collection_path.is_file() {
            return Err(VaultError::SyncFailure {
                reason: format!(
                    "collection file missing: {}",
                    self.collection_path.display()
                ),
            });
        }
        Ok(RefreshOutcome::default())
    }
}

/// Extracts advisory counts from a collection payload
pub trait StatsExtractor: Send + Sync {
    fn extract(&self, payload: &Path) -> Result<CollectionStats>;
}

/// Queries the collection's own SQLite schema for card/note/revlog counts
/// and a per-deck breakdown. Any failure degrades the snapshot to
/// `stats = null`; it never fails the backup.
pub struct CollectionStatsExtractor;

impl StatsExtractor for CollectionStatsExtractor {
    fn extract(&self, payload: &Path) -> Result<CollectionStats> {
        let conn = rusqlite::Connection::open(payload)
            .map_err(|e| stats_error("open_collection", e))?;

        let total_cards: i64 = conn
            .query_row("SELECT COUNT(*) FROM cards", [], |r| r.get(0))
            .map_err(|e| stats_error("count_cards", e))?;
        let total_notes: i64 = conn
            .query_row("SELECT COUNT(*) FROM notes", [], |r| r.get(0))
            .map_err(|e| stats_error("count_notes", e))?;
        let total_revlog: i64 = conn
            .query_row("SELECT COUNT(*) FROM revlog", [], |r| r.get(0))
            .map_err(|e| stats_error("count_revlog", e))?;

        let decks_json: String = conn
            .query_row("SELECT decks FROM col LIMIT 1", [], |r| r.get(0))
            .map_err(|e| stats_error("read_decks", e))?;
        let deck_names = parse_deck_names(&decks_json)?;

        let mut stmt = conn
            .prepare("SELECT did, COUNT(*) FROM cards GROUP BY did")
            .map_err(|e| stats_error("deck_counts", e))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)))
            .map_err(|e| stats_error("deck_counts", e))?;

        let mut deck_stats = Vec::new();
        for row in rows {
            let (did, count) = row.map_err(|e| stats_error("deck_counts", e))?;
            deck_stats.push(DeckStats {
                deck_id: did,
                deck_name: deck_names
                    .get(&did)
                    .cloned()
                    .unwrap_or_else(|| format!("Deck {did}")),
                card_count: count,
            });
        }
        deck_stats.sort_by(|a, b| a.deck_name.cmp(&b.deck_name));

        Ok(CollectionStats {
            total_cards,
            total_decks: deck_names.len() as i64,
            total_notes,
            total_revlog,
            deck_stats,
        })
    }
}

fn parse_deck_names(raw: &str) -> Result<std::collections::HashMap<i64, String>> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| VaultError::serialization("parse_decks", e.to_string()))?;
    let obj = value.as_object().ok_or_else(|| {
        VaultError::serialization("parse_decks", "decks json must be an object".to_string())
    })?;

    let mut names = std::collections::HashMap::new();
    for (id, deck) in obj {
        if let (Ok(parsed_id), Some(name)) =
            (id.parse::<i64>(), deck.get("name").and_then(|v| v.as_str()))
        {
            names.insert(parsed_id, name.to_owned());
        }
    }
    Ok(names)
}

fn stats_error(op: &str, err: rusqlite::Error) -> VaultError {
    VaultError::StorageFailure {
        op: op.to_string(),
        reason: err.to_string(),
    }
}
