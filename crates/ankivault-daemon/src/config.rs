//! Daemon configuration
//!
//! TOML file with section defaults; the data root and database URL can
//! also come from the environment so containers need no config file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ankivault_engine::RetentionPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_ROOT: &str = "./data";
const DEFAULT_COLLECTION: &str = "./collection.anki2";
const DEFAULT_INTERVAL_SECS: u64 = 3600;
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 300;
const DEFAULT_RETENTION_DAYS: i64 = 90;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub scheduler: SchedulerConfig,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub root: Option<String>,
    pub retention_days: Option<i64>,
    pub max_snapshots: Option<usize>,
    /// Postgres URL; unset means the embedded SQLite store
    pub database_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SourceConfig {
    pub collection_path: Option<String>,
    /// Shell command that refreshes the collection file; unset means the
    /// file is maintained externally
    pub sync_command: Option<String>,
    pub sync_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// "development" or "production" (JSON); the daemon defaults to
    /// production, one-shot commands to development
    pub profile: Option<String>,
}

impl Config {
    pub fn root(&self) -> PathBuf {
        std::env::var("ANKIVAULT_ROOT")
            .ok()
            .or_else(|| self.storage.root.clone())
            .unwrap_or_else(|| DEFAULT_ROOT.to_owned())
            .into()
    }

    pub fn database_url(&self) -> Option<String> {
        std::env::var("ANKIVAULT_DATABASE_URL")
            .ok()
            .or_else(|| self.storage.database_url.clone())
    }

    pub fn collection_path(&self) -> PathBuf {
        self.source
            .collection_path
            .clone()
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_owned())
            .into()
    }

    pub fn interval_secs(&self) -> u64 {
        self.scheduler.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    pub fn sync_timeout(&self) -> Duration {
        Duration::from_secs(
            self.source
                .sync_timeout_secs
                .unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS),
        )
    }

    pub fn retention(&self) -> RetentionPolicy {
        RetentionPolicy {
            max_age_days: self.storage.retention_days.unwrap_or(DEFAULT_RETENTION_DAYS),
            max_count: self.storage.max_snapshots,
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing config file {}", path.display()))
}

/// Missing config file falls back to defaults; a present-but-broken one
/// is an error.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}
