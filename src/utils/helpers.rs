// src/utils/helpers.rs

use crate::types::DocumentFields;
use serde_json::Value;
use uuid::Uuid;

/// Prefix marking client-generated document ids that must never reach the
/// remote store.
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Generates a unique queue-entry id.
pub fn generate_queue_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a temporary client-side document id for a CREATE issued
/// offline.
pub fn generate_temporary_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, Uuid::new_v4().simple())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Converts any serializable record into schemaless document fields.
/// Fails if the value does not serialize to a JSON object.
pub fn to_document_fields<T: serde::Serialize>(
    value: &T,
) -> Result<DocumentFields, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected JSON object, got {}",
            other
        ))),
    }
}
