//! Scheduler - aligned periodic ticks plus on-demand triggers
//!
//! Ticks fire at interval boundaries aligned to midnight UTC (the default
//! hourly interval fires at the top of each hour). Startup never assumes
//! a tick is owed: the next boundary is computed and awaited. If the
//! process was down across one or more boundaries, exactly one catch-up
//! tick runs first - missed hours are not back-filled. Overlap is
//! suppressed by the run lock, not queued, so the trigger handle can be
//! poked freely.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Timelike, Utc};
use tokio::sync::Notify;

use crate::orchestrator::{Orchestrator, TickOutcome};

const SECS_PER_DAY: i64 = 86_400;

/// Requests an immediate tick from outside the scheduler loop
#[derive(Clone)]
pub struct TriggerHandle {
    notify: Arc<Notify>,
}

impl TriggerHandle {
    pub fn trigger(&self) {
        self.notify.notify_one();
    }
}

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    interval_secs: u64,
    notify: Arc<Notify>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<Orchestrator>, interval_secs: u64) -> Self {
        Self {
            orchestrator,
            interval_secs: interval_secs.max(1),
            notify: Arc::new(Notify::new()),
        }
    }

    pub fn trigger_handle(&self) -> TriggerHandle {
        TriggerHandle {
            notify: self.notify.clone(),
        }
    }

    /// Whether the process was down across a boundary: true when the most
    /// recent run started before the last boundary. A fresh data root has
    /// no runs and waits for its first boundary instead.
    pub async fn catch_up_due(&self, now: DateTime<Utc>) -> bool {
        match self.orchestrator.latest_run().await {
            Ok(Some(last)) => last.started_at < previous_boundary(now, self.interval_secs),
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(error = %e, "could not determine catch-up state; skipping catch-up");
                false
            }
        }
    }

    /// Run forever. Tick failures are already recorded as run records and
    /// are swallowed here.
    pub async fn run(self) {
        if self.catch_up_due(Utc::now()).await {
            tracing::info!("missed one or more boundaries while down; running catch-up tick");
            self.fire("catch-up").await;
        }

        loop {
            let now = Utc::now();
            let next = next_boundary(now, self.interval_secs);
            let wait = (next - now)
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(1));
            tracing::debug!(next = %next, "waiting for next boundary");

            tokio::select! {
                _ = tokio::time::sleep(wait) => self.fire("scheduled").await,
                _ = self.notify.notified() => self.fire("manual").await,
            }
        }
    }

    async fn fire(&self, kind: &str) {
        match self.orchestrator.tick().await {
            TickOutcome::Created(record) => {
                tracing::info!(kind, snapshot_id = %record.id, "tick created snapshot");
            }
            TickOutcome::Skipped(reason) => {
                tracing::info!(kind, reason = reason.as_str(), "tick skipped");
            }
            TickOutcome::Failed { error_kind, message } => {
                tracing::error!(kind, error_kind, %message, "tick failed");
            }
        }
    }
}

/// Next interval boundary strictly after `now`, aligned to midnight UTC
pub fn next_boundary(now: DateTime<Utc>, interval_secs: u64) -> DateTime<Utc> {
    let interval = interval_secs.max(1) as i64;
    let since_midnight = i64::from(now.num_seconds_from_midnight());
    let next = ((since_midnight / interval) + 1) * interval;
    midnight_of(now) + ChronoDuration::seconds(next.min(SECS_PER_DAY))
}

/// Most recent boundary at or before `now`
pub fn previous_boundary(now: DateTime<Utc>, interval_secs: u64) -> DateTime<Utc> {
    let interval = interval_secs.max(1) as i64;
    let since_midnight = i64::from(now.num_seconds_from_midnight());
    midnight_of(now) + ChronoDuration::seconds((since_midnight / interval) * interval)
}

fn midnight_of(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(
        &now.date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid"),
    )
}
