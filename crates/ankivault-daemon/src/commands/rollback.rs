//! `rollback` - repoint the active pointer

use anyhow::{Context, Result};

use crate::config::Config;

pub async fn execute(config: &Config, snapshot_id: &str) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;

    let event = orchestrator
        .rollback(snapshot_id)
        .await
        .with_context(|| format!("rolling back to {snapshot_id}"))?;

    match event.previous_snapshot_id {
        Some(previous) => println!("active pointer: {previous} -> {}", event.target_snapshot_id),
        None => println!("active pointer set to {}", event.target_snapshot_id),
    }
    Ok(())
}
