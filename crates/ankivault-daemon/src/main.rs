//! ankivault - headless backup/rollback daemon for an Anki collection
//!
//! `serve` runs the scheduler loop; the other subcommands are one-shot
//! operations against the same data root.

use std::path::PathBuf;

use ankivault_core::logging::{self, Profile};
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Debug, Parser)]
#[command(name = "ankivault")]
#[command(about = "Change-aware backups for a single Anki collection", long_about = None)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, global = true, default_value = "ankivault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the daemon: startup recovery, then scheduled ticks
    Serve,
    /// Run one backup tick now
    Backup,
    /// Repoint the active pointer to a prior snapshot
    Rollback {
        /// Target snapshot id
        snapshot_id: String,
    },
    /// List snapshots, newest first
    List,
    /// Show one snapshot in detail
    Show {
        /// Snapshot id
        snapshot_id: String,
    },
    /// Health summary: standing corrupt signal, last run, pointer
    Status,
    /// Rebuild missing metadata rows from snapshot sidecars
    Rebuild,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load_or_default(&cli.config)?;

    let default_profile = match cli.command {
        Commands::Serve => Profile::Production,
        _ => Profile::Development,
    };
    logging::init(resolve_profile(&config, default_profile));

    match cli.command {
        Commands::Serve => commands::serve::execute(&config).await,
        Commands::Backup => commands::backup::execute(&config).await,
        Commands::Rollback { snapshot_id } => {
            commands::rollback::execute(&config, &snapshot_id).await
        }
        Commands::List => commands::inspect::list(&config).await,
        Commands::Show { snapshot_id } => commands::inspect::show(&config, &snapshot_id).await,
        Commands::Status => commands::inspect::status(&config).await,
        Commands::Rebuild => commands::rebuild::execute(&config).await,
    }
}

fn resolve_profile(config: &config::Config, default_profile: Profile) -> Profile {
    match config.logging.profile.as_deref() {
        Some("development") => Profile::Development,
        Some("production") => Profile::Production,
        _ => default_profile,
    }
}
