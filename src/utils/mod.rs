// src/utils/mod.rs

pub mod error;
pub mod helpers;
pub mod logger;
pub mod time;

// Re-export commonly used items
pub use error::{EduSyncError, EduSyncResult, ErrorKind};
pub use helpers::*;
pub use logger::{LogLevel, Logger};
pub use time::*;
