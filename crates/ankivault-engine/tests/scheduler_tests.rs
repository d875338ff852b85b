// Scheduler catch-up decision: exactly one catch-up tick is owed when
// the latest run predates the most recent boundary, none otherwise

mod common;

use ankivault_core::model::run::{RunOutcome, SkipReason};
use ankivault_core::RunRecord;
use ankivault_engine::scheduler::previous_boundary;
use ankivault_engine::Scheduler;
use ankivault_store::MetadataStore;
use chrono::{Duration, Utc};
use common::harness;

async fn record_run_at(h: &common::Harness, started_at: chrono::DateTime<Utc>) {
    h.store
        .insert_run(&RunRecord {
            outcome: RunOutcome::Skipped {
                reason: SkipReason::Unchanged,
            },
            started_at,
            finished_at: started_at,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fresh_data_root_owes_no_catch_up() {
    let h = harness();
    let scheduler = Scheduler::new(h.orchestrator.clone(), 3600);
    assert!(!scheduler.catch_up_due(Utc::now()).await);
}

#[tokio::test]
async fn test_catch_up_due_after_missed_boundary() {
    let h = harness();
    let scheduler = Scheduler::new(h.orchestrator.clone(), 3600);

    // Last run two boundaries ago; the process slept through at least one
    record_run_at(&h, Utc::now() - Duration::hours(2)).await;
    assert!(scheduler.catch_up_due(Utc::now()).await);
}

#[tokio::test]
async fn test_no_catch_up_when_last_run_is_in_current_window() {
    let h = harness();
    let scheduler = Scheduler::new(h.orchestrator.clone(), 3600);

    let now = Utc::now();
    record_run_at(&h, previous_boundary(now, 3600) + Duration::seconds(1)).await;
    assert!(!scheduler.catch_up_due(now).await);
}

#[tokio::test]
async fn test_trigger_handle_requests_immediate_tick() {
    let h = harness();
    let scheduler = Scheduler::new(h.orchestrator.clone(), 3600);
    let trigger = scheduler.trigger_handle();

    // The loop waits for the next boundary (up to an hour away); only the
    // trigger can make it fire within the test budget.
    let task = tokio::spawn(scheduler.run());
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    trigger.trigger();

    let mut created = false;
    for _ in 0..50 {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        if !h.store.list_snapshots().await.unwrap().is_empty() {
            created = true;
            break;
        }
    }
    task.abort();
    assert!(created, "triggered tick should have created a snapshot");
}
