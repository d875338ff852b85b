//! `backup` - one-shot tick

use ankivault_engine::TickOutcome;
use anyhow::{bail, Result};

use crate::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;
    orchestrator.recover().await?;

    match orchestrator.tick().await {
        TickOutcome::Created(record) => {
            println!(
                "created {} ({} bytes, hash {})",
                record.id, record.size_bytes, record.content_hash
            );
            Ok(())
        }
        TickOutcome::Skipped(reason) => {
            println!("skipped ({})", reason.as_str());
            Ok(())
        }
        TickOutcome::Failed { error_kind, message } => {
            bail!("backup failed [{error_kind}]: {message}")
        }
    }
}
