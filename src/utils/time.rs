// src/utils/time.rs

use chrono::{DateTime, Utc};

/// Gets the current UTC date and time.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

/// Gets the current timestamp in seconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp() as u64
}

/// Gets the current timestamp in milliseconds since Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}
