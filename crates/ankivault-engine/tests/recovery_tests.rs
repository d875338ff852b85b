// Startup recovery: orphan sweeps, pointer validation, and rebuilding
// the metadata store from snapshot sidecars

mod common;

use ankivault_engine::TickOutcome;
use ankivault_store::MetadataStore;
use common::harness;

#[tokio::test]
async fn test_crash_between_staging_and_commit_is_swept() {
    let h = harness();
    h.orchestrator.tick().await;

    // Simulated crash: a staged directory exists, no row was written
    let handle = h.repo.stage("2026-08-07T09-00-00Z").unwrap();
    h.repo.write_payload(&handle, b"partial").unwrap();
    drop(handle);

    let rows_before = h.store.list_snapshots().await.unwrap();
    let report = h.orchestrator.recover().await.unwrap();

    assert_eq!(report.staging_swept, 1);
    assert_eq!(report.unindexed_swept, 0);
    assert_eq!(h.store.list_snapshots().await.unwrap(), rows_before);
    assert_eq!(h.repo.list_committed().unwrap().len(), 1);

    let health = h.orchestrator.health().await.unwrap();
    assert!(health.corrupt.is_none());
}

#[tokio::test]
async fn test_recover_sweeps_directories_without_rows() {
    let h = harness();
    let s1 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record.id,
        other => panic!("expected created, got {other:?}"),
    };
    h.refresher.set_content(b"v2");
    let s2 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record.id,
        other => panic!("expected created, got {other:?}"),
    };

    // A prune that died after the row delete leaves a rowless directory
    h.store.delete_snapshot(&s1).await.unwrap();

    let report = h.orchestrator.recover().await.unwrap();
    assert_eq!(report.unindexed_swept, 1);
    assert_eq!(h.repo.list_committed().unwrap(), vec![s2]);
}

#[tokio::test]
async fn test_recover_flags_dangling_pointer_as_corrupt() {
    let h = harness();
    let s1 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record.id,
        other => panic!("expected created, got {other:?}"),
    };

    // Pointer target disappears from both the store and the disk
    h.store.delete_snapshot(&s1).await.unwrap();
    h.repo.delete(&s1).unwrap();

    h.orchestrator.recover().await.unwrap();

    let health = h.orchestrator.health().await.unwrap();
    let detail = health.corrupt.expect("corrupt flag should be raised");
    assert!(detail.contains(&s1));
}

#[tokio::test]
async fn test_rebuild_metadata_restores_rows_from_sidecars() {
    let h = harness();
    let s1 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };
    h.refresher.set_content(b"v2");
    let s2 = match h.orchestrator.tick().await {
        TickOutcome::Created(record) => record,
        other => panic!("expected created, got {other:?}"),
    };

    // Lost metadata store: rows gone, directories intact
    h.store.delete_snapshot(&s1.id).await.unwrap();
    h.store.delete_snapshot(&s2.id).await.unwrap();
    assert!(h.store.list_snapshots().await.unwrap().is_empty());

    let restored = h.orchestrator.rebuild_metadata().await.unwrap();
    assert_eq!(restored, 2);

    let rebuilt = h.store.list_snapshots().await.unwrap();
    assert_eq!(rebuilt.len(), 2);
    let first = rebuilt.iter().find(|s| s.id == s1.id).unwrap();
    assert_eq!(first.content_hash, s1.content_hash);
    assert_eq!(first.size_bytes, s1.size_bytes);
    assert_eq!(first.storage_path, s1.storage_path);

    // Rebuild is idempotent
    assert_eq!(h.orchestrator.rebuild_metadata().await.unwrap(), 0);
}
