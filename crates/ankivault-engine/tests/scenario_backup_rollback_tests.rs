// End-to-end scenario: create at H1, skip at H1, create at H2, roll back
// to the first snapshot

mod common;

use ankivault_core::fingerprint;
use ankivault_core::model::run::{RunOutcome, SkipReason};
use ankivault_engine::TickOutcome;
use ankivault_store::MetadataStore;
use common::harness;

#[tokio::test]
async fn test_create_skip_create_rollback_scenario() {
    let h = harness();

    // Snapshot created at hash H1
    let s1 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };
    assert_eq!(s1.content_hash, fingerprint(b"v1", None));

    // Next tick, source unchanged: run record says skipped
    assert!(matches!(
        h.orchestrator.tick().await,
        TickOutcome::Skipped(SkipReason::Unchanged)
    ));

    // Source changes to H2: a second snapshot appears
    h.refresher.set_content(b"v2");
    let s2 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };
    assert_eq!(s2.content_hash, fingerprint(b"v2", None));
    assert_eq!(h.store.list_snapshots().await.unwrap().len(), 2);

    // Roll back to the first snapshot
    let event = h.orchestrator.rollback(&s1.id).await.unwrap();
    assert_eq!(
        h.orchestrator.active_snapshot_id().unwrap().as_deref(),
        Some(s1.id.as_str())
    );
    assert_eq!(event.previous_snapshot_id.as_deref(), Some(s2.id.as_str()));

    let events = h.store.list_rollback_events().await.unwrap();
    assert_eq!(events.len(), 1);

    // Audit trail shows the full history in order
    let outcomes: Vec<&'static str> = h
        .store
        .list_runs()
        .await
        .unwrap()
        .iter()
        .map(|r| r.outcome.as_str())
        .collect();
    assert_eq!(outcomes, vec!["created", "skipped", "created"]);

    // The created run records reference real snapshots
    let runs = h.store.list_runs().await.unwrap();
    if let RunOutcome::Created { snapshot_id } = &runs[0].outcome {
        assert!(h.store.get_snapshot(snapshot_id).await.unwrap().is_some());
    } else {
        panic!("first run should be created");
    }
}
