//! `rebuild` - reconstruct metadata rows from snapshot sidecars
//!
//! Operator recovery for a lost or damaged metadata store. Runs instead
//! of the normal startup sweep: sweeping first would delete the very
//! directories this command restores rows for.

use anyhow::Result;

use crate::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;

    let restored = orchestrator.rebuild_metadata().await?;
    if restored == 0 {
        println!("metadata already matches the snapshot directories");
    } else {
        println!("restored {restored} metadata row(s) from sidecars");
    }
    Ok(())
}
