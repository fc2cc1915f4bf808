// src/services/write_router.rs
//
// Single entry point for all mutations. Decides per call whether the
// write goes straight to the remote store or into the outbox, and in
// either case reflects it into the local store immediately. Optimistic
// state is never rolled back on a later sync failure; failures surface
// through the error taxonomy and the pending count instead.

use crate::services::config::SyncConfig;
use crate::services::connectivity::ConnectivityMonitor;
use crate::services::local_store::LocalStore;
use crate::services::outbox::DurableOutbox;
use crate::services::remote_store::RemoteStore;
use crate::services::scheduling;
use crate::services::sync_engine::StatusChannel;
use crate::types::{DocumentFields, LessonSlot, MutationItem, OperationType};
use crate::utils::{
    generate_queue_id, generate_temporary_id, EduSyncError, EduSyncResult, Logger,
};
use serde_json::json;
use std::sync::Arc;

pub struct WriteRouter {
    monitor: Arc<ConnectivityMonitor>,
    outbox: Arc<DurableOutbox>,
    local: Arc<LocalStore>,
    remote: Arc<dyn RemoteStore>,
    status: Arc<StatusChannel>,
    config: SyncConfig,
    logger: Logger,
}

impl WriteRouter {
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        outbox: Arc<DurableOutbox>,
        local: Arc<LocalStore>,
        remote: Arc<dyn RemoteStore>,
        status: Arc<StatusChannel>,
        config: SyncConfig,
        logger: Logger,
    ) -> Self {
        Self {
            monitor,
            outbox,
            local,
            remote,
            status,
            config,
            logger,
        }
    }

    /// Issues one mutation. Returns the target document id: the real id
    /// for a direct CREATE, the temporary client id for a queued CREATE,
    /// and the given id for UPDATE/DELETE. Never blocks beyond the
    /// configured remote timeout.
    pub async fn perform_write(
        &self,
        collection: &str,
        operation_type: OperationType,
        payload: DocumentFields,
        document_id: Option<String>,
    ) -> EduSyncResult<String> {
        match operation_type {
            OperationType::Create => {
                if document_id.is_some() {
                    return Err(EduSyncError::validation_error(
                        "CREATE must not carry a document id; the store assigns one",
                    ));
                }
            }
            OperationType::Update | OperationType::Delete => {
                if document_id.as_deref().map_or(true, str::is_empty) {
                    return Err(EduSyncError::validation_error(format!(
                        "{} requires a document id",
                        operation_type
                    )));
                }
            }
        }

        if collection == self.config.timetable_collection
            && operation_type != OperationType::Delete
        {
            self.check_schedule_invariant(&payload, document_id.as_deref())?;
        }

        // Direct writes are only safe when nothing is queued ahead of this
        // one: a non-empty outbox means the global FIFO order must be
        // preserved by queueing behind it, reachable or not.
        let direct = self.monitor.is_reachable()
            && !self.status.is_syncing()
            && self.outbox.count() == 0;

        if direct {
            self.write_direct(collection, operation_type, payload, document_id)
                .await
        } else {
            self.write_queued(collection, operation_type, payload, document_id)
        }
    }

    async fn write_direct(
        &self,
        collection: &str,
        operation_type: OperationType,
        payload: DocumentFields,
        document_id: Option<String>,
    ) -> EduSyncResult<String> {
        match operation_type {
            OperationType::Create => {
                let doc = self
                    .with_timeout(self.remote.add(collection, &payload))
                    .await?;
                self.local.apply_upsert(collection, &doc.id, &payload);
                Ok(doc.id)
            }
            OperationType::Update => {
                let id = document_id.unwrap_or_default();
                // Optimistic: readers see the change before the remote
                // store confirms it, and keep seeing it even if the call
                // fails.
                self.local.apply_upsert(collection, &id, &payload);
                self.with_timeout(self.remote.update(collection, &id, &payload))
                    .await?;
                Ok(id)
            }
            OperationType::Delete => {
                let id = document_id.unwrap_or_default();
                self.local.apply_delete(collection, &id);
                self.with_timeout(self.remote.delete(collection, &id))
                    .await?;
                Ok(id)
            }
        }
    }

    fn write_queued(
        &self,
        collection: &str,
        operation_type: OperationType,
        payload: DocumentFields,
        document_id: Option<String>,
    ) -> EduSyncResult<String> {
        let target_id = match operation_type {
            OperationType::Create => generate_temporary_id(),
            _ => document_id.unwrap_or_default(),
        };

        let item = MutationItem::new(
            generate_queue_id(),
            collection.to_string(),
            operation_type,
            payload.clone(),
            Some(target_id.clone()),
            self.outbox.next_sequence(),
        );

        match operation_type {
            OperationType::Delete => self.local.apply_delete(collection, &target_id),
            _ => self.local.apply_upsert(collection, &target_id, &payload),
        }

        self.outbox.enqueue(item)?;
        let pending = self.outbox.count();
        self.status
            .publish(self.status.current().connection_state, pending);
        self.logger.debug_with_meta(
            "mutation queued",
            Some(&json!({
                "collection": collection,
                "operation": operation_type.as_str(),
                "documentId": target_id,
                "pending": pending,
            })),
        );
        Ok(target_id)
    }

    fn check_schedule_invariant(
        &self,
        payload: &DocumentFields,
        document_id: Option<&str>,
    ) -> EduSyncResult<()> {
        let mut candidate: LessonSlot =
            serde_json::from_value(serde_json::Value::Object(payload.clone())).map_err(|e| {
                EduSyncError::validation_error(format!("timetable payload is not a slot: {}", e))
            })?;
        candidate.id = document_id.map(str::to_string);

        let snapshot = self.local.snapshot(&self.config.timetable_collection);
        let existing = scheduling::snapshot_slots(&snapshot);
        if scheduling::has_conflict(existing.iter(), &candidate) {
            return Err(EduSyncError::conflict_detected(format!(
                "teacher {} already scheduled on {} at {}",
                candidate.teacher_id, candidate.day, candidate.start_time
            )));
        }
        Ok(())
    }

    async fn with_timeout<T>(
        &self,
        fut: impl std::future::Future<Output = EduSyncResult<T>>,
    ) -> EduSyncResult<T> {
        match tokio::time::timeout(self.config.remote_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(EduSyncError::timeout_error(format!(
                "remote call exceeded {:?}",
                self.config.remote_timeout
            ))),
        }
    }
}
