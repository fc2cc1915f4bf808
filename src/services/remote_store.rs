// src/services/remote_store.rs
//
// Contract the sync layer consumes from the remote document store. The
// real backend is external; `InMemoryRemoteStore` is a faithful local
// implementation used by the end-to-end tests and by hosts that want a
// loopback mode.

use crate::types::{CollectionSnapshot, Document, DocumentFields};
use crate::utils::{generate_queue_id, EduSyncError, EduSyncResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Stream of full-collection snapshots. The remote side delivers the
/// current membership immediately on subscribe and again on every change;
/// dropping the subscription releases it.
pub struct CollectionSubscription {
    pub collection: String,
    pub snapshots: mpsc::UnboundedReceiver<CollectionSnapshot>,
}

/// Collection-oriented CRUD plus per-collection change subscriptions.
/// All write failures surface as `RemoteWriteError`-kind errors; the
/// caller decides whether that means "retry later" (drain) or "report
/// now" (direct write).
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates a document; the store assigns and returns the id.
    async fn add(&self, collection: &str, payload: &DocumentFields) -> EduSyncResult<Document>;

    /// Applies a partial update to an existing document.
    async fn update(
        &self,
        collection: &str,
        document_id: &str,
        payload: &DocumentFields,
    ) -> EduSyncResult<()>;

    /// Deletes an existing document.
    async fn delete(&self, collection: &str, document_id: &str) -> EduSyncResult<()>;

    /// Opens a snapshot subscription for one collection.
    fn subscribe(&self, collection: &str) -> EduSyncResult<CollectionSubscription>;
}

#[derive(Default)]
struct RemoteState {
    collections: HashMap<String, CollectionSnapshot>,
    watchers: HashMap<String, Vec<mpsc::UnboundedSender<CollectionSnapshot>>>,
}

/// In-process remote store. Generates `s_<uuid>`-style ids and pushes a
/// full snapshot to every live subscriber after each committed write.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    state: Mutex<RemoteState>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read used by tests to compare remote truth against
    /// expectations.
    pub fn collection(&self, name: &str) -> CollectionSnapshot {
        self.state
            .lock()
            .map(|s| s.collections.get(name).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn lock(&self) -> EduSyncResult<std::sync::MutexGuard<'_, RemoteState>> {
        self.state
            .lock()
            .map_err(|e| EduSyncError::remote_write_error(format!("store lock poisoned: {}", e)))
    }

    fn notify(state: &mut RemoteState, collection: &str) {
        let snapshot = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        if let Some(watchers) = state.watchers.get_mut(collection) {
            // Closed receivers mean the subscriber was torn down.
            watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn add(&self, collection: &str, payload: &DocumentFields) -> EduSyncResult<Document> {
        let mut state = self.lock()?;
        let id = format!("s_{}", generate_queue_id());
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), payload.clone());
        Self::notify(&mut state, collection);
        Ok(Document {
            id,
            fields: payload.clone(),
        })
    }

    async fn update(
        &self,
        collection: &str,
        document_id: &str,
        payload: &DocumentFields,
    ) -> EduSyncResult<()> {
        let mut state = self.lock()?;
        let doc = state
            .collections
            .get_mut(collection)
            .and_then(|c| c.get_mut(document_id))
            .ok_or_else(|| {
                EduSyncError::remote_write_error(format!(
                    "no document {} in {}",
                    document_id, collection
                ))
            })?;
        for (key, value) in payload {
            doc.insert(key.clone(), value.clone());
        }
        Self::notify(&mut state, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, document_id: &str) -> EduSyncResult<()> {
        let mut state = self.lock()?;
        let removed = state
            .collections
            .get_mut(collection)
            .and_then(|c| c.remove(document_id));
        if removed.is_none() {
            return Err(EduSyncError::remote_write_error(format!(
                "no document {} in {}",
                document_id, collection
            )));
        }
        Self::notify(&mut state, collection);
        Ok(())
    }

    fn subscribe(&self, collection: &str) -> EduSyncResult<CollectionSubscription> {
        let mut state = self.lock()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let snapshot = state
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        // Initial delivery carries the current full membership.
        let _ = tx.send(snapshot);
        state
            .watchers
            .entry(collection.to_string())
            .or_default()
            .push(tx);
        Ok(CollectionSubscription {
            collection: collection.to_string(),
            snapshots: rx,
        })
    }
}
