// DurableOutbox Unit Tests
// Ordering, idempotent dequeue, durability across reopen, and storage
// failure surfacing.

#[path = "../../common/mod.rs"]
mod common;

use common::{fields, FlakyStorage, SharedStorage};
use edusync::services::{
    DurableOutbox, FileStorage, MemoryStorage, OutboxStorage, OutboxStorageError,
};
use edusync::types::{MutationItem, OperationType};
use edusync::ErrorKind;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn item(outbox: &DurableOutbox, id: &str, op: OperationType, doc: Option<&str>) -> MutationItem {
    MutationItem::new(
        id.to_string(),
        "students".to_string(),
        op,
        fields(&[("name", json!(id))]),
        doc.map(str::to_string),
        outbox.next_sequence(),
    )
}

#[test]
fn enqueue_preserves_order_and_count_matches_list() {
    let outbox = DurableOutbox::open(Box::new(MemoryStorage::new())).unwrap();
    for id in ["q1", "q2", "q3"] {
        let it = item(&outbox, id, OperationType::Create, Some("temp_x"));
        outbox.enqueue(it).unwrap();
    }

    let listed = outbox.list();
    assert_eq!(outbox.count(), 3);
    assert_eq!(listed.len(), outbox.count());
    assert_eq!(
        listed.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        vec!["q1", "q2", "q3"]
    );
    assert!(listed.windows(2).all(|w| w[0].enqueued_at < w[1].enqueued_at));
}

#[test]
fn dequeue_is_idempotent() {
    let outbox = DurableOutbox::open(Box::new(MemoryStorage::new())).unwrap();
    let it = item(&outbox, "q1", OperationType::Update, Some("s_1"));
    outbox.enqueue(it).unwrap();

    outbox.dequeue("q1").unwrap();
    assert_eq!(outbox.count(), 0);

    // Second removal of the same id: no error, no effect.
    outbox.dequeue("q1").unwrap();
    assert_eq!(outbox.count(), 0);

    // Unknown id is equally a no-op.
    outbox.dequeue("never-existed").unwrap();
}

#[test]
fn queue_survives_reopen_and_sequence_resumes() {
    let path = std::env::temp_dir().join(format!("edusync-outbox-{}.json", uuid_suffix()));

    let last_sequence = {
        let outbox = DurableOutbox::open(Box::new(FileStorage::new(&path))).unwrap();
        outbox
            .enqueue(item(&outbox, "q1", OperationType::Create, Some("temp_1")))
            .unwrap();
        outbox
            .enqueue(item(&outbox, "q2", OperationType::Update, Some("temp_1")))
            .unwrap();
        outbox.list().last().unwrap().enqueued_at
    };

    // Simulated restart: a fresh outbox over the same file.
    let reopened = DurableOutbox::open(Box::new(FileStorage::new(&path))).unwrap();
    assert_eq!(reopened.count(), 2);
    assert_eq!(
        reopened.list().iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
        vec!["q1", "q2"]
    );
    assert!(reopened.next_sequence() > last_sequence);

    let _ = std::fs::remove_file(&path);
}

#[test]
fn storage_write_failure_surfaces_and_queue_is_unchanged() {
    let storage = Arc::new(FlakyStorage::new());
    let outbox = DurableOutbox::open(Box::new(SharedStorage(Arc::clone(&storage)))).unwrap();
    outbox
        .enqueue(item(&outbox, "q1", OperationType::Create, Some("temp_1")))
        .unwrap();

    storage.fail_writes(true);
    let err = outbox
        .enqueue(item(&outbox, "q2", OperationType::Create, Some("temp_2")))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::StorageFailure);

    // The failed item must not be half-enqueued.
    assert_eq!(outbox.count(), 1);
    assert_eq!(outbox.list()[0].id, "q1");

    storage.fail_writes(false);
    outbox
        .enqueue(item(&outbox, "q3", OperationType::Create, Some("temp_3")))
        .unwrap();
    assert_eq!(outbox.count(), 2);
}

#[test]
fn remap_rewrites_only_matching_items_and_persists() {
    let storage = Arc::new(FlakyStorage::new());
    let outbox = DurableOutbox::open(Box::new(SharedStorage(Arc::clone(&storage)))).unwrap();
    outbox
        .enqueue(item(&outbox, "q1", OperationType::Update, Some("temp_1")))
        .unwrap();
    outbox
        .enqueue(item(&outbox, "q2", OperationType::Update, Some("s_9")))
        .unwrap();
    outbox
        .enqueue(item(&outbox, "q3", OperationType::Delete, Some("temp_1")))
        .unwrap();

    let remapped = outbox.remap_document_id("temp_1", "s_42").unwrap();
    assert_eq!(remapped, 2);

    let ids: Vec<Option<String>> = outbox.list().into_iter().map(|i| i.document_id).collect();
    assert_eq!(
        ids,
        vec![
            Some("s_42".to_string()),
            Some("s_9".to_string()),
            Some("s_42".to_string())
        ]
    );

    // The rewrite reached the medium, not just memory.
    let persisted = storage.load().unwrap();
    assert_eq!(persisted[0].document_id.as_deref(), Some("s_42"));
    assert_eq!(persisted[2].document_id.as_deref(), Some("s_42"));

    // Nothing left to remap.
    assert_eq!(outbox.remap_document_id("temp_1", "s_42").unwrap(), 0);
}

#[test]
fn reads_recover_the_queue_after_a_panic_during_persist() {
    // Storage that panics mid-write, leaving the queue lock poisoned.
    struct PanickyStorage {
        panic_writes: Arc<AtomicBool>,
    }

    impl OutboxStorage for PanickyStorage {
        fn load(&self) -> Result<Vec<MutationItem>, OutboxStorageError> {
            Ok(Vec::new())
        }

        fn persist(&self, _items: &[MutationItem]) -> Result<(), OutboxStorageError> {
            if self.panic_writes.load(Ordering::SeqCst) {
                panic!("simulated crash mid-write");
            }
            Ok(())
        }
    }

    let panic_writes = Arc::new(AtomicBool::new(false));
    let outbox = Arc::new(
        DurableOutbox::open(Box::new(PanickyStorage {
            panic_writes: Arc::clone(&panic_writes),
        }))
        .unwrap(),
    );
    outbox
        .enqueue(item(&outbox, "q1", OperationType::Create, Some("temp_1")))
        .unwrap();

    panic_writes.store(true, Ordering::SeqCst);
    let doomed = item(&outbox, "q2", OperationType::Create, Some("temp_2"));
    let worker = Arc::clone(&outbox);
    let joined = std::thread::spawn(move || worker.enqueue(doomed)).join();
    assert!(joined.is_err());

    // The queued items are still there and the two read paths agree;
    // neither collapses to an empty outbox.
    let listed = outbox.list();
    assert_eq!(outbox.count(), listed.len());
    assert!(listed.iter().any(|i| i.id == "q1"));
}

fn uuid_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    format!(
        "{}-{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    )
}
