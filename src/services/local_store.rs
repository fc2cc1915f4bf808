// src/services/local_store.rs
//
// In-memory mirror of the remote collections. This is what the rest of
// the application reads: optimistic writes land here immediately, remote
// snapshots replace collection content wholesale when they arrive.

use crate::services::remote_store::CollectionSubscription;
use crate::types::{CollectionSnapshot, DocumentFields};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct LocalStore {
    collections: RwLock<HashMap<String, CollectionSnapshot>>,
    publishers: Mutex<HashMap<String, watch::Sender<CollectionSnapshot>>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            publishers: Mutex::new(HashMap::new()),
        }
    }

    /// Current membership of one collection.
    pub fn snapshot(&self, collection: &str) -> CollectionSnapshot {
        self.collections
            .read()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Live view of one collection. The receiver observes the current
    /// snapshot immediately and every change afterwards; dropping it
    /// releases the consumer's interest.
    pub fn watch(&self, collection: &str) -> watch::Receiver<CollectionSnapshot> {
        let snapshot = self.snapshot(collection);
        let mut publishers = self
            .publishers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        publishers
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(snapshot).0)
            .subscribe()
    }

    /// Optimistic upsert from the write router: merge fields into the
    /// document, creating it if absent.
    pub fn apply_upsert(&self, collection: &str, document_id: &str, payload: &DocumentFields) {
        if let Ok(mut collections) = self.collections.write() {
            let doc = collections
                .entry(collection.to_string())
                .or_default()
                .entry(document_id.to_string())
                .or_default();
            for (key, value) in payload {
                doc.insert(key.clone(), value.clone());
            }
        }
        self.publish(collection);
    }

    /// Optimistic delete from the write router.
    pub fn apply_delete(&self, collection: &str, document_id: &str) {
        if let Ok(mut collections) = self.collections.write() {
            if let Some(docs) = collections.get_mut(collection) {
                docs.remove(document_id);
            }
        }
        self.publish(collection);
    }

    /// Remote snapshot delivery: the collection becomes exactly what the
    /// remote store reported.
    pub fn replace_collection(&self, collection: &str, snapshot: CollectionSnapshot) {
        if let Ok(mut collections) = self.collections.write() {
            collections.insert(collection.to_string(), snapshot);
        }
        self.publish(collection);
    }

    /// Moves a document from its temporary client id to the id the remote
    /// store assigned during drain.
    pub fn rename_document(&self, collection: &str, temp_id: &str, real_id: &str) {
        if let Ok(mut collections) = self.collections.write() {
            if let Some(docs) = collections.get_mut(collection) {
                if let Some(fields) = docs.remove(temp_id) {
                    docs.insert(real_id.to_string(), fields);
                }
            }
        }
        self.publish(collection);
    }

    fn publish(&self, collection: &str) {
        let snapshot = self.snapshot(collection);
        if let Ok(publishers) = self.publishers.lock() {
            if let Some(tx) = publishers.get(collection) {
                let _ = tx.send(snapshot);
            }
        }
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped remote subscription: a background task pumps remote snapshots
/// into the local store until the guard is dropped, which also closes the
/// remote-side subscription.
pub struct SubscriptionGuard {
    collection: String,
    task: JoinHandle<()>,
}

impl SubscriptionGuard {
    /// Attaches one remote subscription to the local store.
    pub fn attach(local: Arc<LocalStore>, subscription: CollectionSubscription) -> Self {
        let collection = subscription.collection.clone();
        let mut snapshots = subscription.snapshots;
        let task_collection = collection.clone();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = snapshots.recv().await {
                local.replace_collection(&task_collection, snapshot);
            }
        });
        Self { collection, task }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        // Tearing the task down drops the receiver, which the remote side
        // observes as an unsubscribe.
        self.task.abort();
    }
}
