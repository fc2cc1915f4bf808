// src/services/config.rs

use std::time::Duration;

/// Tunables for the sync layer. `Default` matches the reference behavior;
/// `from_env` lets deployments override without code changes.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Periodic drain trigger while reachable.
    pub sync_interval: Duration,
    /// Bound on every remote-store call. An elapsed timer counts as a
    /// failed commit so a hung backend cannot wedge the queue.
    pub remote_timeout: Duration,
    /// Collection guarded by the scheduling invariant checker.
    pub timetable_collection: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval: Duration::from_secs(10),
            remote_timeout: Duration::from_secs(15),
            timetable_collection: "timetable".to_string(),
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = read_env_u64("EDUSYNC_SYNC_INTERVAL_SECS") {
            config.sync_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = read_env_u64("EDUSYNC_REMOTE_TIMEOUT_SECS") {
            config.remote_timeout = Duration::from_secs(secs);
        }
        if let Ok(name) = std::env::var("EDUSYNC_TIMETABLE_COLLECTION") {
            if !name.trim().is_empty() {
                config.timetable_collection = name;
            }
        }
        config
    }
}

fn read_env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
