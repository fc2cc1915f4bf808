// src/services/client.rs
//
// Facade wiring the whole layer together. Constructed once per process
// and passed by reference to consumers; there are no ambient globals.

use crate::services::config::SyncConfig;
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::local_store::{LocalStore, SubscriptionGuard};
use crate::services::outbox::{DurableOutbox, OutboxStorage};
use crate::services::remote_store::RemoteStore;
use crate::services::scheduling;
use crate::services::sync_engine::{DrainOutcome, StatusChannel, SyncEngine, SyncEngineHandle};
use crate::services::write_router::WriteRouter;
use crate::types::{
    CollectionSnapshot, ConnectionState, DocumentFields, LessonSlot, OperationType, SyncStatus,
};
use crate::utils::{EduSyncResult, Logger};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

pub struct OfflineClient {
    monitor: Arc<ConnectivityMonitor>,
    outbox: Arc<DurableOutbox>,
    local: Arc<LocalStore>,
    status: Arc<StatusChannel>,
    remote: Arc<dyn RemoteStore>,
    router: WriteRouter,
    engine: Arc<SyncEngine>,
    engine_handle: Mutex<Option<SyncEngineHandle>>,
    subscriptions: Mutex<HashMap<String, SubscriptionGuard>>,
    config: SyncConfig,
}

impl OfflineClient {
    /// Opens the outbox, wires the services together and starts the sync
    /// engine's trigger tasks. Must run inside a Tokio runtime.
    pub fn init(
        remote: Arc<dyn RemoteStore>,
        storage: Box<dyn OutboxStorage>,
        config: SyncConfig,
    ) -> EduSyncResult<Self> {
        let logger = Logger::from_env();
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let outbox = Arc::new(DurableOutbox::open(storage)?);
        let local = Arc::new(LocalStore::new());
        let status = Arc::new(StatusChannel::new(SyncStatus {
            connection_state: ConnectionState::Offline,
            pending_changes: outbox.count(),
        }));

        let router = WriteRouter::new(
            Arc::clone(&monitor),
            Arc::clone(&outbox),
            Arc::clone(&local),
            Arc::clone(&remote),
            Arc::clone(&status),
            config.clone(),
            logger.child(HashMap::from([(
                "service".to_string(),
                serde_json::json!("write_router"),
            )])),
        );

        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&outbox),
            Arc::clone(&remote),
            Arc::clone(&local),
            Arc::clone(&monitor),
            Arc::clone(&status),
            config.clone(),
            logger.child(HashMap::from([(
                "service".to_string(),
                serde_json::json!("sync_engine"),
            )])),
        ));
        let engine_handle = engine.spawn();

        Ok(Self {
            monitor,
            outbox,
            local,
            status,
            remote,
            router,
            engine,
            engine_handle: Mutex::new(Some(engine_handle)),
            subscriptions: Mutex::new(HashMap::new()),
            config,
        })
    }

    /// Host integration point: report a reachability transition observed
    /// by whatever connectivity detection the platform provides.
    pub fn set_reachable(&self, reachable: bool) {
        self.monitor.set_reachable(reachable);
    }

    /// Issues one mutation; see `WriteRouter::perform_write`.
    pub async fn perform_write(
        &self,
        collection: &str,
        operation_type: OperationType,
        payload: DocumentFields,
        document_id: Option<String>,
    ) -> EduSyncResult<String> {
        self.router
            .perform_write(collection, operation_type, payload, document_id)
            .await
    }

    /// Live per-collection view. The first call for a collection opens
    /// the remote subscription; later calls share it.
    pub fn subscribe(&self, collection: &str) -> EduSyncResult<watch::Receiver<CollectionSnapshot>> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .map_err(|e| crate::utils::EduSyncError::storage_failure(e.to_string()))?;
        if !subscriptions.contains_key(collection) {
            let subscription = self.remote.subscribe(collection)?;
            subscriptions.insert(
                collection.to_string(),
                SubscriptionGuard::attach(Arc::clone(&self.local), subscription),
            );
        }
        Ok(self.local.watch(collection))
    }

    /// Releases the remote subscription for one collection. Local
    /// watchers keep the last snapshot but stop receiving remote changes.
    pub fn unsubscribe(&self, collection: &str) {
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            subscriptions.remove(collection);
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.status.current().connection_state
    }

    pub fn pending_changes(&self) -> usize {
        self.outbox.count()
    }

    /// Watch the combined connection-state/pending-count status.
    pub fn status_watch(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Snapshot read of one collection, optimistic writes included.
    pub fn snapshot(&self, collection: &str) -> CollectionSnapshot {
        self.local.snapshot(collection)
    }

    /// Advisory scheduling check against the current timetable snapshot.
    pub fn has_schedule_conflict(&self, candidate: &LessonSlot) -> bool {
        let snapshot = self.local.snapshot(&self.config.timetable_collection);
        let existing = scheduling::snapshot_slots(&snapshot);
        scheduling::has_conflict(existing.iter(), candidate)
    }

    /// Manual drain trigger, e.g. behind a "sync now" button.
    pub async fn sync_now(&self) -> DrainOutcome {
        self.engine.try_drain().await
    }

    /// Stops background tasks and releases every remote subscription.
    /// Queued mutations stay persisted for the next `init`.
    pub async fn dispose(&self) {
        let handle = self
            .engine_handle
            .lock()
            .ok()
            .and_then(|mut h| h.take());
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            subscriptions.clear();
        }
    }
}
