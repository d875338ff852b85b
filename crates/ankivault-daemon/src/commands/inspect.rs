//! `list`, `show`, `status` - read-only inspection
//!
//! These never take the run lock and can be used while the daemon runs.

use anyhow::{bail, Result};

use crate::config::Config;

pub async fn list(config: &Config) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;
    let snapshots = orchestrator.list_snapshots().await?;
    let active = orchestrator.active_snapshot_id()?;

    if snapshots.is_empty() {
        println!("no snapshots");
        return Ok(());
    }
    for snapshot in snapshots {
        let marker = if active.as_deref() == Some(snapshot.id.as_str()) {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {}  {}  {}",
            snapshot.id,
            format_size(snapshot.size_bytes),
            snapshot.content_hash
        );
    }
    Ok(())
}

pub async fn show(config: &Config, snapshot_id: &str) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;
    let Some(snapshot) = orchestrator.get_snapshot(snapshot_id).await? else {
        bail!("snapshot not found: {snapshot_id}");
    };

    println!("id:              {}", snapshot.id);
    println!("created_at:      {}", snapshot.created_at.to_rfc3339());
    println!("content_hash:    {}", snapshot.content_hash);
    println!("size:            {}", format_size(snapshot.size_bytes));
    println!("storage_path:    {}", snapshot.storage_path);
    if let Some(revision) = &snapshot.source_revision {
        println!("source_revision: {revision}");
    }
    match &snapshot.stats {
        Some(stats) => {
            println!(
                "stats:           {} cards, {} notes, {} decks, {} revlog entries",
                stats.total_cards, stats.total_notes, stats.total_decks, stats.total_revlog
            );
            for deck in &stats.deck_stats {
                println!("  {}: {} cards", deck.deck_name, deck.card_count);
            }
        }
        None => println!("stats:           (none)"),
    }
    Ok(())
}

pub async fn status(config: &Config) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;
    let health = orchestrator.health().await?;

    println!("snapshots:       {}", health.snapshot_count);
    println!(
        "active snapshot: {}",
        health.active_snapshot_id.as_deref().unwrap_or("(unset)")
    );
    match &health.last_run {
        Some(run) => println!(
            "last run:        {} at {}",
            run.outcome.as_str(),
            run.started_at.to_rfc3339()
        ),
        None => println!("last run:        (never)"),
    }
    match &health.corrupt {
        Some(detail) => {
            println!("health:          CORRUPT - {detail}");
            bail!("on-disk state and metadata diverge");
        }
        None => println!("health:          ok"),
    }
    Ok(())
}

fn format_size(bytes: i64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
