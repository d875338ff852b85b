//! `serve` - startup recovery, then the scheduler loop until ctrl-c

use std::sync::Arc;

use ankivault_engine::Scheduler;
use anyhow::Result;
use tracing::info;

use crate::config::Config;

pub async fn execute(config: &Config) -> Result<()> {
    let orchestrator = super::build_orchestrator(config).await?;

    let report = orchestrator.recover().await?;
    info!(
        staging_swept = report.staging_swept,
        unindexed_swept = report.unindexed_swept,
        "startup recovery complete"
    );

    let scheduler = Scheduler::new(Arc::clone(&orchestrator), config.interval_secs());
    info!(
        interval_secs = config.interval_secs(),
        root = %config.root().display(),
        "starting scheduler"
    );
    let scheduler_task = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");
    scheduler_task.abort();
    Ok(())
}
