// src/utils/error.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub type EduSyncResult<T> = Result<T, EduSyncError>;

/// Custom error details for additional context
pub type ErrorDetails = HashMap<String, serde_json::Value>;

/// Main error type for the offline data layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EduSyncError {
    pub message: String,
    pub details: Option<Box<ErrorDetails>>,
    pub error_code: Option<String>,
    pub kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    #[default]
    UnknownError,
    /// The outbox's durable medium cannot be read or written. Fatal for
    /// the calling operation, never swallowed.
    StorageFailure,
    /// A single item failed to commit to the remote store. Recovered
    /// locally by leaving the item queued for retry.
    RemoteWriteError,
    /// A candidate write would violate a read-side invariant. Raised
    /// before the write is issued, so it never enters the outbox.
    ConflictDetected,
    /// A remote call neither succeeded nor failed within the bound the
    /// engine imposes. Treated exactly like `RemoteWriteError` by the
    /// drain loop.
    TimeoutError,
    ValidationError,
    SerializationError,
    NotFoundError,
}

impl fmt::Display for EduSyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EduSyncError {}

impl EduSyncError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            error_code: None,
            kind,
        }
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = Some(Box::new(details));
        self
    }

    pub fn with_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = Some(error_code.into());
        self
    }

    /// Whether the drain loop should keep the item queued and retry on
    /// the next trigger.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RemoteWriteError | ErrorKind::TimeoutError
        )
    }

    // Convenience constructors for common error types
    pub fn storage_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageFailure, message).with_code("STORAGE_FAILURE")
    }

    pub fn remote_write_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteWriteError, message).with_code("REMOTE_WRITE_ERROR")
    }

    pub fn conflict_detected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConflictDetected, message).with_code("CONFLICT_DETECTED")
    }

    pub fn timeout_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TimeoutError, message).with_code("TIMEOUT_ERROR")
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationError, message).with_code("VALIDATION_ERROR")
    }

    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SerializationError, message).with_code("SERIALIZATION_ERROR")
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFoundError, message).with_code("NOT_FOUND")
    }
}

// Implement From conversions for common error types
impl From<serde_json::Error> for EduSyncError {
    fn from(err: serde_json::Error) -> Self {
        EduSyncError::serialization_error(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for EduSyncError {
    fn from(err: std::io::Error) -> Self {
        EduSyncError::storage_failure(format!("I/O error: {}", err))
    }
}

impl From<crate::services::outbox::OutboxStorageError> for EduSyncError {
    fn from(err: crate::services::outbox::OutboxStorageError) -> Self {
        EduSyncError::storage_failure(err.to_string())
    }
}
