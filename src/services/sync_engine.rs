// src/services/sync_engine.rs
//
// Drains the outbox against the remote store in strict enqueue order.
// This file carries the single most important correctness property of the
// whole layer: items are committed one at a time, in order, and the pass
// stops on the first failure so later writes can never overtake the
// side effects they depend on.

use crate::services::config::SyncConfig;
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::local_store::LocalStore;
use crate::services::outbox::DurableOutbox;
use crate::services::remote_store::RemoteStore;
use crate::types::{ConnectionState, MutationItem, OperationType, SyncStatus};
use crate::utils::{is_temporary_id, EduSyncError, EduSyncResult, Logger};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Publishes `SyncStatus` to the rest of the application. The write
/// router and the engine both feed it; consumers watch it for the pending
/// count and the ONLINE/OFFLINE/SYNCING state.
pub struct StatusChannel {
    tx: watch::Sender<SyncStatus>,
}

impl StatusChannel {
    pub fn new(initial: SyncStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn publish(&self, connection_state: ConnectionState, pending_changes: usize) {
        // send_replace updates the stored value even when no receiver is
        // alive, so current() always reflects the latest publication.
        self.tx.send_replace(SyncStatus {
            connection_state,
            pending_changes,
        });
    }

    pub fn current(&self) -> SyncStatus {
        self.tx.borrow().clone()
    }

    pub fn is_syncing(&self) -> bool {
        self.tx.borrow().connection_state == ConnectionState::Syncing
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }
}

/// Outcome of one drain attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Every queued item committed (possibly zero of them).
    Completed { committed: usize },
    /// An item failed; it and everything behind it stay queued.
    Stopped { committed: usize, pending: usize },
    /// Another drain pass holds the lock; this trigger is dropped.
    AlreadyDraining,
    /// Not reachable; nothing attempted.
    Offline,
}

pub struct SyncEngine {
    outbox: Arc<DurableOutbox>,
    remote: Arc<dyn RemoteStore>,
    local: Arc<LocalStore>,
    monitor: Arc<ConnectivityMonitor>,
    status: Arc<StatusChannel>,
    config: SyncConfig,
    logger: Logger,
    drain_lock: Mutex<()>,
}

impl SyncEngine {
    pub fn new(
        outbox: Arc<DurableOutbox>,
        remote: Arc<dyn RemoteStore>,
        local: Arc<LocalStore>,
        monitor: Arc<ConnectivityMonitor>,
        status: Arc<StatusChannel>,
        config: SyncConfig,
        logger: Logger,
    ) -> Self {
        Self {
            outbox,
            remote,
            local,
            monitor,
            status,
            config,
            logger,
            drain_lock: Mutex::new(()),
        }
    }

    /// Attempts one drain pass. A trigger arriving while a pass is
    /// already running is dropped, not queued; the next periodic trigger
    /// re-checks naturally.
    pub async fn try_drain(&self) -> DrainOutcome {
        let Ok(_guard) = self.drain_lock.try_lock() else {
            self.logger.debug("drain trigger dropped: already draining");
            return DrainOutcome::AlreadyDraining;
        };

        if !self.monitor.is_reachable() {
            self.status
                .publish(ConnectionState::Offline, self.outbox.count());
            return DrainOutcome::Offline;
        }

        let items = self.outbox.list();
        if items.is_empty() {
            self.status.publish(ConnectionState::Online, 0);
            return DrainOutcome::Completed { committed: 0 };
        }

        self.status
            .publish(ConnectionState::Syncing, items.len());
        self.logger.info_with_meta(
            "drain pass started",
            Some(&json!({ "pending": items.len() })),
        );

        // Temporary ids a CREATE resolved during this pass. The item list
        // was snapshotted before any remap persisted, so later snapshot
        // entries still carry the temp id and are translated here.
        let mut resolved_ids: HashMap<String, String> = HashMap::new();
        let mut committed = 0usize;

        for item in &items {
            match self.commit_item(item, &mut resolved_ids).await {
                Ok(()) => {
                    if let Err(err) = self.outbox.dequeue(&item.id) {
                        // Storage failure: the item committed remotely but
                        // is still queued. Stop the pass; the retry is a
                        // duplicate-at-least-once, never a loss.
                        self.logger.error_with_meta(
                            "failed to dequeue committed item",
                            Some(&json!({ "itemId": item.id, "error": err.to_string() })),
                        );
                        break;
                    }
                    committed += 1;
                }
                Err(err) => {
                    self.logger.warn_with_meta(
                        "drain stopped on failed item",
                        Some(&json!({
                            "itemId": item.id,
                            "collection": item.collection,
                            "operation": item.operation_type.as_str(),
                            "error": err.to_string(),
                        })),
                    );
                    break;
                }
            }
        }

        let pending = self.outbox.count();
        let state = if self.monitor.is_reachable() {
            ConnectionState::Online
        } else {
            ConnectionState::Offline
        };
        self.status.publish(state, pending);

        if pending == 0 {
            self.logger
                .info_with_meta("drain pass complete", Some(&json!({ "committed": committed })));
            DrainOutcome::Completed { committed }
        } else {
            DrainOutcome::Stopped { committed, pending }
        }
    }

    /// Commits one item against the remote store, bounded by the
    /// configured timeout.
    async fn commit_item(
        &self,
        item: &MutationItem,
        resolved_ids: &mut HashMap<String, String>,
    ) -> EduSyncResult<()> {
        match item.operation_type {
            OperationType::Create => {
                // The temporary client id never leaves this process; the
                // payload alone goes up and the store assigns the real id.
                let doc = self
                    .with_timeout(self.remote.add(&item.collection, &item.payload))
                    .await?;
                if let Some(temp_id) = item.document_id.as_deref() {
                    if is_temporary_id(temp_id) {
                        resolved_ids.insert(temp_id.to_string(), doc.id.clone());
                        self.outbox.remap_document_id(temp_id, &doc.id)?;
                        self.local.rename_document(&item.collection, temp_id, &doc.id);
                    }
                }
                Ok(())
            }
            OperationType::Update => {
                let target = self.resolve_target(item, resolved_ids)?;
                self.with_timeout(self.remote.update(&item.collection, &target, &item.payload))
                    .await
            }
            OperationType::Delete => {
                let target = self.resolve_target(item, resolved_ids)?;
                self.with_timeout(self.remote.delete(&item.collection, &target))
                    .await
            }
        }
    }

    fn resolve_target(
        &self,
        item: &MutationItem,
        resolved_ids: &HashMap<String, String>,
    ) -> EduSyncResult<String> {
        let target = item.document_id.as_deref().ok_or_else(|| {
            EduSyncError::validation_error(format!(
                "{} item {} has no target document id",
                item.operation_type, item.id
            ))
        })?;
        if let Some(real) = resolved_ids.get(target) {
            return Ok(real.clone());
        }
        if is_temporary_id(target) {
            // The CREATE this item depends on has not committed yet, so
            // sending the temp id upstream can only corrupt. Failing here
            // keeps the item queued behind its dependency.
            return Err(EduSyncError::remote_write_error(format!(
                "item {} references uncommitted temporary id {}",
                item.id, target
            )));
        }
        Ok(target.to_string())
    }

    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = EduSyncResult<T>>,
    ) -> EduSyncResult<T> {
        match tokio::time::timeout(self.config.remote_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(EduSyncError::timeout_error(format!(
                "remote call exceeded {:?}",
                self.config.remote_timeout
            ))),
        }
    }

    /// Starts the two trigger tasks: the became-reachable edge listener
    /// and the fixed periodic timer. Returns a handle that stops both.
    pub fn spawn(self: &Arc<Self>) -> SyncEngineHandle {
        let edge_engine = Arc::clone(self);
        // Subscribe before the task starts so a transition arriving right
        // after spawn is not missed.
        let mut reachability = edge_engine.monitor.subscribe();
        let edge_task = tokio::spawn(async move {
            loop {
                if reachability.changed().await.is_err() {
                    break;
                }
                let reachable = *reachability.borrow_and_update();
                let pending = edge_engine.outbox.count();
                if reachable {
                    edge_engine.logger.info_with_meta(
                        "connectivity regained",
                        Some(&json!({ "pending": pending })),
                    );
                    edge_engine.try_drain().await;
                } else {
                    edge_engine.logger.info("connectivity lost");
                    edge_engine
                        .status
                        .publish(ConnectionState::Offline, pending);
                }
            }
        });

        let timer_engine = Arc::clone(self);
        let timer_task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(timer_engine.config.sync_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so spawn is not
            // itself a drain trigger.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if timer_engine.monitor.is_reachable() {
                    timer_engine.try_drain().await;
                }
            }
        });

        SyncEngineHandle {
            tasks: vec![edge_task, timer_task],
        }
    }
}

/// Handle controlling the background trigger tasks.
pub struct SyncEngineHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SyncEngineHandle {
    pub async fn shutdown(mut self) {
        for task in std::mem::take(&mut self.tasks) {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for SyncEngineHandle {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
