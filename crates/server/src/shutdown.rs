//! Cooperative shutdown for long-running loops
//!
//! Every background loop (hub, feeds, HTTP server) holds a [`Shutdown`]
//! and exits once the paired [`ShutdownTrigger`] fires. Dropping the
//! trigger counts as firing it.

use std::sync::Arc;
use tokio::sync::watch;

/// Create a linked trigger/listener pair
pub fn shutdown_channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (
        ShutdownTrigger { tx },
        Shutdown {
            rx,
            _keepalive: None,
        },
    )
}

/// Fires the shutdown signal for every linked [`Shutdown`]
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    /// Another listener linked to this trigger
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
            _keepalive: None,
        }
    }
}

/// Listener side of the shutdown signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl Shutdown {
    /// A signal that never fires
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Shutdown {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown has been requested
    pub async fn wait(&mut self) {
        // Err means the trigger was dropped
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    /// Owned variant of [`Shutdown::wait`], for APIs that take a `'static` future
    pub async fn wait_owned(mut self) {
        self.wait().await
    }
}
