// Shared test harness: scripted collaborators and a fully wired
// orchestrator over a temp data root with the SQLite backend.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ankivault_core::{CollectionStats, Result, VaultError};
use ankivault_engine::{
    EngineConfig, Orchestrator, RefreshOutcome, RetentionPolicy, SourceRefresher, StatsExtractor,
};
use ankivault_store::{BackupRepository, SqliteStore};
use tempfile::TempDir;

/// Refresher with programmable content: each refresh rewrites the
/// collection file, mimicking "on success the file reflects upstream".
pub struct ScriptedRefresher {
    collection_path: PathBuf,
    content: Mutex<Vec<u8>>,
    failing: Mutex<bool>,
    delay: Mutex<Duration>,
}

impl ScriptedRefresher {
    pub fn new(collection_path: PathBuf, initial: &[u8]) -> Self {
        Self {
            collection_path,
            content: Mutex::new(initial.to_vec()),
            failing: Mutex::new(false),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    pub fn set_content(&self, content: &[u8]) {
        *self.content.lock().unwrap() = content.to_vec();
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Slow the refresh down so a run holds the lock for a while
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait::async_trait]
impl SourceRefresher for ScriptedRefresher {
    async fn refresh(&self) -> Result<RefreshOutcome> {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.failing.lock().unwrap() {
            return Err(VaultError::SyncFailure {
                reason: "scripted failure".to_string(),
            });
        }
        let content = self.content.lock().unwrap().clone();
        std::fs::write(&self.collection_path, content)
            .map_err(|e| VaultError::storage("write_collection", e))?;
        Ok(RefreshOutcome::default())
    }
}

/// Refresher that never finishes inside a short timeout budget
pub struct SlowRefresher;

#[async_trait::async_trait]
impl SourceRefresher for SlowRefresher {
    async fn refresh(&self) -> Result<RefreshOutcome> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(RefreshOutcome::default())
    }
}

/// Stats collaborator that always fails; snapshots degrade to null stats
pub struct NoStats;

impl StatsExtractor for NoStats {
    fn extract(&self, _payload: &std::path::Path) -> Result<CollectionStats> {
        Err(VaultError::StorageFailure {
            op: "stats".to_string(),
            reason: "stats disabled in tests".to_string(),
        })
    }
}

pub struct Harness {
    pub tmp: TempDir,
    pub repo: BackupRepository,
    pub store: Arc<SqliteStore>,
    pub refresher: Arc<ScriptedRefresher>,
    pub orchestrator: Arc<Orchestrator>,
    pub collection_path: PathBuf,
}

pub fn harness() -> Harness {
    harness_with_retention(RetentionPolicy::default())
}

pub fn harness_with_retention(retention: RetentionPolicy) -> Harness {
    let tmp = TempDir::new().unwrap();
    let collection_path = tmp.path().join("collection.anki2");
    let repo = BackupRepository::new(tmp.path().join("data")).unwrap();
    let store = Arc::new(SqliteStore::new(repo.state_dir().join("metadata.db")).unwrap());
    let refresher = Arc::new(ScriptedRefresher::new(collection_path.clone(), b"v1"));
    let orchestrator = Arc::new(Orchestrator::new(
        repo.clone(),
        store.clone(),
        refresher.clone(),
        Arc::new(NoStats),
        EngineConfig {
            collection_path: collection_path.clone(),
            sync_timeout: Duration::from_secs(5),
            retention,
        },
    ));
    Harness {
        tmp,
        repo,
        store,
        refresher,
        orchestrator,
        collection_path,
    }
}

/// Orchestrator wired with arbitrary collaborators, for timeout and
/// stats-extraction tests
pub fn build_orchestrator(
    tmp: &TempDir,
    refresher: Arc<dyn SourceRefresher>,
    stats: Arc<dyn StatsExtractor>,
    sync_timeout: Duration,
) -> (BackupRepository, Arc<SqliteStore>, Arc<Orchestrator>) {
    let repo = BackupRepository::new(tmp.path().join("data")).unwrap();
    let store = Arc::new(SqliteStore::new(repo.state_dir().join("metadata.db")).unwrap());
    let orchestrator = Arc::new(Orchestrator::new(
        repo.clone(),
        store.clone(),
        refresher,
        stats,
        EngineConfig {
            collection_path: tmp.path().join("collection.anki2"),
            sync_timeout,
            retention: RetentionPolicy::default(),
        },
    ));
    (repo, store, orchestrator)
}
