// src/services/mod.rs

pub mod client;
pub mod config;
pub mod connectivity;
pub mod local_store;
pub mod outbox;
pub mod remote_store;
pub mod scheduling;
pub mod sync_engine;
pub mod write_router;

// Re-export commonly used services
pub use client::OfflineClient;
pub use config::SyncConfig;
pub use connectivity::ConnectivityMonitor;
pub use local_store::{LocalStore, SubscriptionGuard};
pub use outbox::{DurableOutbox, FileStorage, MemoryStorage, OutboxStorage, OutboxStorageError};
pub use remote_store::{CollectionSubscription, InMemoryRemoteStore, RemoteStore};
pub use scheduling::{has_conflict, snapshot_slots};
pub use sync_engine::{DrainOutcome, StatusChannel, SyncEngine, SyncEngineHandle};
pub use write_router::WriteRouter;
