//! Offline-first data layer for the EduSync school platform.
//!
//! Accepts writes regardless of connectivity, persists them in a durable
//! outbox, replays them against the remote document store in issue order
//! once connectivity returns, and exposes a live eventually-consistent
//! view of every collection.
//!
//! The pieces, leaf first: [`services::ConnectivityMonitor`] reports
//! reachability, [`services::DurableOutbox`] holds unconfirmed writes,
//! [`services::LocalStore`] mirrors the remote collections for readers,
//! [`services::WriteRouter`] routes each mutation directly or into the
//! outbox, [`services::SyncEngine`] drains the outbox strictly in order,
//! and [`services::OfflineClient`] wires them together with an
//! `init`/`dispose` lifecycle.

// Module declarations
pub mod services;
pub mod types;
pub mod utils;

// Re-export the surface most hosts need
pub use services::{OfflineClient, RemoteStore, SyncConfig};
pub use types::{ConnectionState, MutationItem, OperationType, SyncStatus};
pub use utils::{EduSyncError, EduSyncResult, ErrorKind};
