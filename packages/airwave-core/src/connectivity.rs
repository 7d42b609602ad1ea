//! Online/offline signal fan-out.
//!
//! Wraps the platform's connectivity signals in a `watch` channel so any
//! number of consumers can observe transitions. The monitor forwards what
//! the platform reports; genuine-transition deduplication is the platform's
//! contract (browsers already suppress duplicate `online`/`offline` events),
//! and the controller additionally compares against its own last-known state.

use tokio::sync::watch;

/// Fan-out point for browser-level (or host-level) connectivity signals.
pub struct ConnectivityMonitor {
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Creates a monitor with the given initial state.
    #[must_use]
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self { tx }
    }

    /// Creates a monitor that starts online - for hosts without a
    /// connectivity signal, where failures surface as stream errors instead.
    #[must_use]
    pub fn assume_online() -> Self {
        Self::new(true)
    }

    /// Forwards a connectivity signal from the platform.
    pub fn set_online(&self, online: bool) {
        self.tx.send_replace(online);
    }

    /// The last reported state.
    #[must_use]
    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Subscribes to connectivity transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
