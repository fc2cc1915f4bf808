// src/services/connectivity.rs
//
// Tracks reachability of the remote store. The detection mechanism
// (browser events, socket probes, heartbeats) lives in the host
// application; hosts report transitions through `set_reachable` and the
// sync engine arms itself on the became-reachable edge.

use tokio::sync::watch;

pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given starting reachability.
    pub fn new(initially_reachable: bool) -> Self {
        let (tx, _) = watch::channel(initially_reachable);
        Self { tx }
    }

    /// Current reachability.
    pub fn is_reachable(&self) -> bool {
        *self.tx.borrow()
    }

    /// Reports a reachability observation. Repeated reports of the same
    /// state are absorbed; subscribers only wake on transitions.
    pub fn set_reachable(&self, reachable: bool) {
        self.tx.send_if_modified(|current| {
            if *current == reachable {
                false
            } else {
                *current = reachable;
                true
            }
        });
    }

    /// Edge-triggered transition signal. Receivers observe the value at
    /// wake time, so a flap that settles back is seen at most once.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
