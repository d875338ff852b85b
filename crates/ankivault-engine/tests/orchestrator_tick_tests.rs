// Tick state machine: change detection, first-run behaviour, failure
// recording, and commit visibility

mod common;

use std::sync::Arc;
use std::time::Duration;

use ankivault_core::fingerprint;
use ankivault_core::model::run::{RunOutcome, SkipReason};
use ankivault_engine::TickOutcome;
use ankivault_store::MetadataStore;
use common::{build_orchestrator, harness, NoStats, SlowRefresher};
use tempfile::TempDir;

#[tokio::test]
async fn test_first_run_always_creates() {
    let h = harness();

    let outcome = h.orchestrator.tick().await;
    let record = match outcome {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };

    assert_eq!(record.content_hash, fingerprint(b"v1", None));
    assert_eq!(h.store.list_snapshots().await.unwrap().len(), 1);
    assert_eq!(
        h.orchestrator.active_snapshot_id().unwrap().as_deref(),
        Some(record.id.as_str())
    );

    let runs = h.store.list_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(
        runs[0].outcome,
        RunOutcome::Created {
            snapshot_id: record.id.clone()
        }
    );
}

#[tokio::test]
async fn test_unchanged_source_is_skipped() {
    let h = harness();

    h.orchestrator.tick().await;
    let outcome = h.orchestrator.tick().await;

    assert!(matches!(outcome, TickOutcome::Skipped(SkipReason::Unchanged)));
    assert_eq!(h.store.list_snapshots().await.unwrap().len(), 1);
    assert_eq!(h.repo.list_committed().unwrap().len(), 1);

    let runs = h.store.list_runs().await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(
        runs[1].outcome,
        RunOutcome::Skipped {
            reason: SkipReason::Unchanged
        }
    );
}

#[tokio::test]
async fn test_changed_source_creates_exactly_one_snapshot() {
    let h = harness();
    h.orchestrator.tick().await;

    h.refresher.set_content(b"v2");
    let outcome = h.orchestrator.tick().await;

    let record = match outcome {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };
    assert_eq!(record.content_hash, fingerprint(b"v2", None));

    let snapshots = h.store.list_snapshots().await.unwrap();
    assert_eq!(snapshots.len(), 2);
    // newest first
    assert_eq!(snapshots[0].id, record.id);
}

#[tokio::test]
async fn test_sync_failure_is_recorded_and_swallowed() {
    let h = harness();
    h.refresher.set_failing(true);

    let outcome = h.orchestrator.tick().await;

    match outcome {
        TickOutcome::Failed { error_kind, .. } => assert_eq!(error_kind, "ERR_SYNC_FAILURE"),
        other => panic!("expected failed, got {other:?}"),
    }
    assert!(h.store.list_snapshots().await.unwrap().is_empty());

    let runs = h.store.list_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(
        runs[0].outcome,
        RunOutcome::Failed {
            error_kind: "ERR_SYNC_FAILURE".into()
        }
    );
}

#[tokio::test]
async fn test_sync_timeout_converts_to_failed_run() {
    let tmp = TempDir::new().unwrap();
    let (_repo, store, orchestrator) = build_orchestrator(
        &tmp,
        Arc::new(SlowRefresher),
        Arc::new(NoStats),
        Duration::from_millis(50),
    );

    let outcome = orchestrator.tick().await;

    match outcome {
        TickOutcome::Failed { error_kind, .. } => assert_eq!(error_kind, "ERR_SYNC_TIMEOUT"),
        other => panic!("expected failed, got {other:?}"),
    }
    let runs = store.list_runs().await.unwrap();
    assert_eq!(
        runs[0].outcome,
        RunOutcome::Failed {
            error_kind: "ERR_SYNC_TIMEOUT".into()
        }
    );
}

#[tokio::test]
async fn test_listing_is_unchanged_by_a_failed_run() {
    let h = harness();
    h.orchestrator.tick().await;
    let before = h.store.list_snapshots().await.unwrap();

    // The collection path turns into a directory: the refresh cannot
    // write it and the run fails before anything is staged.
    h.refresher.set_content(b"v2");
    std::fs::remove_file(&h.collection_path).unwrap();
    std::fs::create_dir(&h.collection_path).unwrap();
    let outcome = h.orchestrator.tick().await;
    match outcome {
        TickOutcome::Failed { error_kind, .. } => assert_eq!(error_kind, "ERR_STORAGE_FAILURE"),
        other => panic!("expected failed, got {other:?}"),
    }

    let after = h.store.list_snapshots().await.unwrap();
    assert_eq!(before, after);
    assert_eq!(h.repo.list_committed().unwrap().len(), 1);
}

#[tokio::test]
async fn test_successful_run_adds_exactly_one_listing_entry() {
    let h = harness();
    h.orchestrator.tick().await;
    let before = h.store.list_snapshots().await.unwrap();

    h.refresher.set_content(b"v2");
    h.orchestrator.tick().await;

    let after = h.store.list_snapshots().await.unwrap();
    assert_eq!(after.len(), before.len() + 1);
}

#[tokio::test]
async fn test_stats_failure_degrades_to_null() {
    let h = harness(); // NoStats always fails

    let outcome = h.orchestrator.tick().await;
    let record = match outcome {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };

    assert!(record.stats.is_none());
    let stored = h.store.get_snapshot(&record.id).await.unwrap().unwrap();
    assert!(stored.stats.is_none());

    // Sidecar carries the same degraded value
    let sidecar = h.repo.read_sidecar(&record.id).unwrap();
    assert!(sidecar.stats.is_none());
    assert_eq!(sidecar.content_hash, record.content_hash);
}
