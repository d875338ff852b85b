//! Subcommand implementations and shared wiring

pub mod backup;
pub mod inspect;
pub mod rebuild;
pub mod rollback;
pub mod serve;

use std::sync::Arc;

use ankivault_engine::{
    CollectionStatsExtractor, CommandRefresher, EngineConfig, NoopRefresher, Orchestrator,
    SourceRefresher,
};
use ankivault_store::{BackupRepository, MetadataStore, PostgresStore, SqliteStore};
use anyhow::{Context, Result};

use crate::config::Config;

/// Wire the orchestrator from configuration: repository, metadata backend
/// (embedded unless a database URL is set), refresher and stats extractor.
pub async fn build_orchestrator(config: &Config) -> Result<Arc<Orchestrator>> {
    let root = config.root();
    let repo = BackupRepository::new(&root)
        .with_context(|| format!("opening backup repository at {}", root.display()))?;

    let store: Arc<dyn MetadataStore> = match config.database_url() {
        Some(url) => Arc::new(
            PostgresStore::new(&url)
                .await
                .context("connecting to postgres metadata store")?,
        ),
        None => Arc::new(
            SqliteStore::new(repo.state_dir().join("metadata.db"))
                .context("opening sqlite metadata store")?,
        ),
    };

    let collection_path = config.collection_path();
    let refresher: Arc<dyn SourceRefresher> = match &config.source.sync_command {
        Some(command) => Arc::new(CommandRefresher::new(command.clone())),
        None => Arc::new(NoopRefresher::new(collection_path.clone())),
    };

    Ok(Arc::new(Orchestrator::new(
        repo,
        store,
        refresher,
        Arc::new(CollectionStatsExtractor),
        EngineConfig {
            collection_path,
            sync_timeout: config.sync_timeout(),
            retention: config.retention(),
        },
    )))
}
