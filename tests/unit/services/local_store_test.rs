// LocalStore Unit Tests
// Snapshot reads, watch delivery, wholesale remote replacement and scoped
// remote subscriptions.

#[path = "../../common/mod.rs"]
mod common;

use common::fields;
use edusync::services::{InMemoryRemoteStore, LocalStore, RemoteStore, SubscriptionGuard};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn watch_sees_the_current_snapshot_then_every_change() {
    let store = LocalStore::new();
    store.apply_upsert("students", "s_1", &fields(&[("name", json!("A"))]));

    let mut rx = store.watch("students");
    assert_eq!(rx.borrow_and_update()["s_1"]["name"], json!("A"));

    store.apply_upsert("students", "s_2", &fields(&[("name", json!("B"))]));
    rx.changed().await.unwrap();
    assert_eq!(rx.borrow_and_update().len(), 2);

    store.apply_delete("students", "s_1");
    rx.changed().await.unwrap();
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.contains_key("s_2"));
}

#[tokio::test]
async fn upsert_merges_fields_into_existing_documents() {
    let store = LocalStore::new();
    store.apply_upsert(
        "students",
        "s_1",
        &fields(&[("name", json!("A")), ("grade", json!("5"))]),
    );
    store.apply_upsert("students", "s_1", &fields(&[("grade", json!("6"))]));

    let snapshot = store.snapshot("students");
    assert_eq!(snapshot["s_1"]["name"], json!("A"));
    assert_eq!(snapshot["s_1"]["grade"], json!("6"));
}

#[tokio::test]
async fn remote_snapshot_replaces_collection_wholesale() {
    let store = LocalStore::new();
    store.apply_upsert("students", "stale", &fields(&[("name", json!("old"))]));

    let mut incoming = edusync::types::CollectionSnapshot::new();
    incoming.insert("s_42".to_string(), fields(&[("name", json!("fresh"))]));
    store.replace_collection("students", incoming);

    let snapshot = store.snapshot("students");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot["s_42"]["name"], json!("fresh"));
}

#[tokio::test]
async fn rename_document_moves_temp_entry_to_real_id() {
    let store = LocalStore::new();
    store.apply_upsert("students", "temp_1", &fields(&[("name", json!("A"))]));

    store.rename_document("students", "temp_1", "s_42");

    let snapshot = store.snapshot("students");
    assert!(!snapshot.contains_key("temp_1"));
    assert_eq!(snapshot["s_42"]["name"], json!("A"));

    // Renaming something absent is harmless.
    store.rename_document("students", "temp_gone", "s_43");
    assert_eq!(store.snapshot("students").len(), 1);
}

#[tokio::test]
async fn subscription_guard_pumps_remote_snapshots_until_dropped() {
    let local = Arc::new(LocalStore::new());
    let remote = InMemoryRemoteStore::new();

    let guard = SubscriptionGuard::attach(
        Arc::clone(&local),
        remote.subscribe("students").unwrap(),
    );
    assert_eq!(guard.collection(), "students");

    remote
        .add("students", &fields(&[("name", json!("A"))]))
        .await
        .unwrap();

    // Let the pump task deliver.
    let mut delivered = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        if local.snapshot("students").len() == 1 {
            delivered = true;
            break;
        }
    }
    assert!(delivered);

    drop(guard);
    tokio::time::sleep(Duration::from_millis(10)).await;

    remote
        .add("students", &fields(&[("name", json!("B"))]))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The guard is gone; the local mirror no longer follows the remote.
    assert_eq!(local.snapshot("students").len(), 1);
}
