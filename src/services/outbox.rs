// src/services/outbox.rs
//
// Durable, ordered list of pending mutations. Every operation persists
// synchronously before returning, so a crash between an enqueue and the
// next drain pass never loses or duplicates a queued item.

use crate::types::MutationItem;
use crate::utils::{EduSyncError, EduSyncResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Failure of the backing medium. Always fatal for the calling operation.
#[derive(Debug, Error)]
pub enum OutboxStorageError {
    #[error("outbox read failed: {0}")]
    Read(String),
    #[error("outbox write failed: {0}")]
    Write(String),
    #[error("outbox content is not valid JSON: {0}")]
    Corrupt(String),
}

/// Ordered key-value contract the outbox persists through. The medium
/// (file, embedded database, browser storage) is an implementation detail
/// behind this trait.
pub trait OutboxStorage: Send + Sync {
    fn load(&self) -> Result<Vec<MutationItem>, OutboxStorageError>;
    fn persist(&self, items: &[MutationItem]) -> Result<(), OutboxStorageError>;
}

/// Volatile storage for tests and for hosts that accept losing the queue
/// on process exit.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<Vec<MutationItem>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OutboxStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<MutationItem>, OutboxStorageError> {
        Ok(self
            .items
            .lock()
            .map_err(|e| OutboxStorageError::Read(e.to_string()))?
            .clone())
    }

    fn persist(&self, items: &[MutationItem]) -> Result<(), OutboxStorageError> {
        *self
            .items
            .lock()
            .map_err(|e| OutboxStorageError::Write(e.to_string()))? = items.to_vec();
        Ok(())
    }
}

/// JSON file storage. Writes go to a sibling temp file first and are
/// renamed over the target, so a crash mid-write leaves the previous
/// queue intact.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl OutboxStorage for FileStorage {
    fn load(&self) -> Result<Vec<MutationItem>, OutboxStorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| OutboxStorageError::Read(e.to_string()))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&raw).map_err(|e| OutboxStorageError::Corrupt(e.to_string()))
    }

    fn persist(&self, items: &[MutationItem]) -> Result<(), OutboxStorageError> {
        let raw = serde_json::to_string(items)
            .map_err(|e| OutboxStorageError::Write(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, raw).map_err(|e| OutboxStorageError::Write(e.to_string()))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| OutboxStorageError::Write(e.to_string()))
    }
}

/// The mutation queue itself. Items keep strict enqueue order; nothing in
/// here ever reorders them.
pub struct DurableOutbox {
    storage: Box<dyn OutboxStorage>,
    items: Mutex<Vec<MutationItem>>,
    sequence: AtomicU64,
}

impl DurableOutbox {
    /// Opens the outbox, restoring any queue a previous process left
    /// behind. The sequence counter resumes past the highest persisted
    /// marker so restarts never reissue an `enqueued_at` value.
    pub fn open(storage: Box<dyn OutboxStorage>) -> EduSyncResult<Self> {
        let items = storage.load()?;
        let max_sequence = items.iter().map(|i| i.enqueued_at).max().unwrap_or(0);
        Ok(Self {
            storage,
            items: Mutex::new(items),
            sequence: AtomicU64::new(max_sequence),
        })
    }

    /// Next `enqueued_at` marker. Callers stamp the item before handing
    /// it to `enqueue`.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Appends an item and persists before returning. A storage failure
    /// leaves the in-memory queue unchanged and is surfaced to the caller.
    pub fn enqueue(&self, item: MutationItem) -> EduSyncResult<MutationItem> {
        let mut items = self.lock_items()?;
        items.push(item.clone());
        if let Err(err) = self.storage.persist(&items) {
            items.pop();
            return Err(err.into());
        }
        Ok(item)
    }

    /// Removes a specific item by queue id. Removing an id that is no
    /// longer present is a no-op, not an error.
    pub fn dequeue(&self, item_id: &str) -> EduSyncResult<()> {
        let mut items = self.lock_items()?;
        let before = items.len();
        items.retain(|i| i.id != item_id);
        if items.len() == before {
            return Ok(());
        }
        if let Err(err) = self.storage.persist(&items) {
            return Err(err.into());
        }
        Ok(())
    }

    /// All pending items in enqueue order. A lock poisoned by a panic
    /// elsewhere still holds the real queue, so reads recover it rather
    /// than reporting an empty outbox.
    pub fn list(&self) -> Vec<MutationItem> {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Queue length; always equal to `list().len()`.
    pub fn count(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Rewrites the target document id of still-queued items after a
    /// CREATE committed and the remote store assigned the real id. Returns
    /// how many items were rewritten. Persisted, so causally-dependent
    /// chains survive a restart between two drain passes.
    pub fn remap_document_id(&self, temp_id: &str, real_id: &str) -> EduSyncResult<usize> {
        let mut items = self.lock_items()?;
        let mut remapped = 0;
        let original = items.clone();
        for item in items.iter_mut() {
            if item.document_id.as_deref() == Some(temp_id) {
                item.document_id = Some(real_id.to_string());
                remapped += 1;
            }
        }
        if remapped == 0 {
            return Ok(0);
        }
        if let Err(err) = self.storage.persist(&items) {
            *items = original;
            return Err(err.into());
        }
        Ok(remapped)
    }

    fn lock_items(&self) -> EduSyncResult<std::sync::MutexGuard<'_, Vec<MutationItem>>> {
        self.items
            .lock()
            .map_err(|e| EduSyncError::storage_failure(format!("outbox lock poisoned: {}", e)))
    }
}
