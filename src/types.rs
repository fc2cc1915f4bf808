// src/types.rs

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schemaless document body used for collection records and mutation payloads.
pub type DocumentFields = Map<String, Value>;

/// A document as the remote store returns it: generated id plus fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub fields: DocumentFields,
}

/// Full membership of one collection, keyed by document id.
pub type CollectionSnapshot = std::collections::HashMap<String, DocumentFields>;

/// Kind of write carried by a `MutationItem`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    Create,
    Update,
    Delete,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "CREATE",
            OperationType::Update => "UPDATE",
            OperationType::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One pending write, persisted in the outbox until the remote store
/// confirms it. Items are immutable once enqueued; the only lifecycle
/// transition is removal after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationItem {
    /// Queue-entry id, not the target document's id.
    pub id: String,
    pub collection: String,
    pub operation_type: OperationType,
    /// Fields to write; empty for DELETE.
    pub payload: DocumentFields,
    /// Target document id. A temporary client id for CREATE issued
    /// offline; present and authoritative for UPDATE/DELETE.
    pub document_id: Option<String>,
    /// Monotonic sequence establishing total replay order.
    pub enqueued_at: u64,
}

impl MutationItem {
    pub fn new(
        id: String,
        collection: String,
        operation_type: OperationType,
        payload: DocumentFields,
        document_id: Option<String>,
        enqueued_at: u64,
    ) -> Self {
        Self {
            id,
            collection,
            operation_type,
            payload,
            document_id,
            enqueued_at,
        }
    }

    /// Whether this item targets a client-generated temporary id.
    pub fn targets_temporary_id(&self) -> bool {
        self.document_id
            .as_deref()
            .map(crate::utils::is_temporary_id)
            .unwrap_or(false)
    }
}

/// Observable connection state. `Syncing` is a sub-state of online entered
/// while the sync engine holds the drain lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    Online,
    Offline,
    Syncing,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Online => "ONLINE",
            ConnectionState::Offline => "OFFLINE",
            ConnectionState::Syncing => "SYNCING",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sync status published to the rest of the application: connection state
/// plus the number of queued mutations. `pending_changes` always matches
/// the outbox length at publication time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub connection_state: ConnectionState,
    pub pending_changes: usize,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            connection_state: ConnectionState::Offline,
            pending_changes: 0,
        }
    }
}

// ============= DOMAIN RECORDS =============
// Typed views over the schemaless collections, used by the invariant
// checkers and by consumers that want structured access.

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub grade: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guardian_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub student_id: String,
    pub amount: f64,
    pub recorded_at: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Kind of timetable slot. Breaks apply to every teacher at once and never
/// participate in conflict checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Lesson,
    Break,
}

impl Default for SlotKind {
    fn default() -> Self {
        SlotKind::Lesson
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonSlot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub day: String,
    pub start_time: String,
    pub teacher_id: String,
    pub class_id: String,
    #[serde(default)]
    pub kind: SlotKind,
}
