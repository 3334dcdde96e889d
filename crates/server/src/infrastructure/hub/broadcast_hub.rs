use async_trait::async_trait;
use axum::extract::ws::Utf8Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use thiserror::Error;
use tickerhub_core::Instrument;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::application::ports::{PublishError, SnapshotPublisher};
use crate::infrastructure::config::HubConfig;
use crate::shutdown::Shutdown;

/// Opaque subscriber handle, unique for the life of the hub
pub type SubscriberId = u64;

/// A serialized snapshot. Clones share one buffer, down to the socket frame.
pub type Payload = Utf8Bytes;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Broadcast hub has stopped")]
    Stopped,
}

struct Registration {
    id: SubscriberId,
    tx: mpsc::Sender<Payload>,
}

/// Fan-out of instrument snapshots to live subscribers
///
/// The hub is a single task that owns the subscriber set and handles one
/// event at a time: a registration, an unregistration or a snapshot to
/// publish. Membership changes and broadcasts therefore never interleave.
///
/// Each subscriber has its own bounded outbound queue. Publishing offers
/// the payload to every queue without waiting; a queue that is closed or
/// full marks its subscriber as dead and it is evicted in the same cycle.
/// Writing to the actual socket happens in the subscriber's own task.
pub struct BroadcastHub {
    register_rx: mpsc::UnboundedReceiver<Registration>,
    unregister_rx: mpsc::UnboundedReceiver<SubscriberId>,
    publish_rx: mpsc::Receiver<Vec<Instrument>>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Payload>>,
    subscriber_count: Arc<AtomicUsize>,
}

impl BroadcastHub {
    /// Create the hub and a handle for talking to it. The hub does nothing
    /// until [`BroadcastHub::run`] is polled.
    pub fn new(config: &HubConfig) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (publish_tx, publish_rx) = mpsc::channel(config.publish_capacity.max(1));
        let subscriber_count = Arc::new(AtomicUsize::new(0));

        let hub = BroadcastHub {
            register_rx,
            unregister_rx,
            publish_rx,
            subscribers: HashMap::new(),
            subscriber_count: Arc::clone(&subscriber_count),
        };

        let handle = HubHandle {
            register_tx,
            unregister_tx,
            publish_tx,
            next_id: Arc::new(AtomicU64::new(1)),
            subscriber_count,
            queue_capacity: config.subscriber_queue.max(1),
        };

        (hub, handle)
    }

    /// Create the hub and run it on its own task
    pub fn spawn(config: &HubConfig, shutdown: Shutdown) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::new(config);
        let task = tokio::spawn(hub.run(shutdown));
        (handle, task)
    }

    /// Coordinating loop. Exits on shutdown or once every handle is gone.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        info!("Broadcast hub started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.wait() => break,

                Some(registration) = self.register_rx.recv() => self.register(registration),

                Some(id) = self.unregister_rx.recv() => self.unregister(id),

                snapshot = self.publish_rx.recv() => match snapshot {
                    Some(snapshot) => self.broadcast(&snapshot),
                    None => break,
                },
            }
        }

        let remaining = self.subscribers.len();
        self.subscribers.clear();
        self.update_count();
        info!(subscribers = remaining, "Broadcast hub stopped");
    }

    fn register(&mut self, registration: Registration) {
        self.subscribers.insert(registration.id, registration.tx);
        self.update_count();
        debug!(
            subscriber = registration.id,
            total = self.subscribers.len(),
            "Subscriber registered"
        );
    }

    fn unregister(&mut self, id: SubscriberId) {
        // Dropping the sender closes the subscriber's queue, which in turn
        // ends its writer task and releases the connection.
        if self.subscribers.remove(&id).is_some() {
            self.update_count();
            debug!(
                subscriber = id,
                total = self.subscribers.len(),
                "Subscriber unregistered"
            );
        }
    }

    fn broadcast(&mut self, snapshot: &[Instrument]) {
        let payload: Payload = match serde_json::to_string(snapshot) {
            Ok(json) => Utf8Bytes::from(json),
            Err(e) => {
                error!(error = %e, "Failed to serialize snapshot, dropping publish");
                return;
            }
        };

        let before = self.subscribers.len();
        self.subscribers
            .retain(|id, tx| match tx.try_send(payload.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!(subscriber = *id, "Subscriber stalled, evicting");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(subscriber = *id, "Subscriber disconnected, evicting");
                    false
                }
            });

        let evicted = before - self.subscribers.len();
        if evicted > 0 {
            self.update_count();
        }
        trace!(
            instruments = snapshot.len(),
            delivered = self.subscribers.len(),
            evicted,
            "Snapshot broadcast"
        );
    }

    fn update_count(&self) {
        self.subscriber_count
            .store(self.subscribers.len(), Ordering::SeqCst);
    }
}

/// Cloneable entry point into a running [`BroadcastHub`]
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::UnboundedSender<Registration>,
    unregister_tx: mpsc::UnboundedSender<SubscriberId>,
    publish_tx: mpsc::Sender<Vec<Instrument>>,
    next_id: Arc<AtomicU64>,
    subscriber_count: Arc<AtomicUsize>,
    queue_capacity: usize,
}

impl HubHandle {
    /// Register a new subscriber and return its receiving end
    pub fn subscribe(&self) -> Result<Subscription, HubError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        self.register_tx
            .send(Registration { id, tx })
            .map_err(|_| HubError::Stopped)?;

        Ok(Subscription {
            id,
            rx,
            unregister_tx: self.unregister_tx.clone(),
        })
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Queue a snapshot for broadcast. Waits only if the hub is backlogged.
    pub async fn publish(&self, snapshot: Vec<Instrument>) -> Result<(), HubError> {
        self.publish_tx
            .send(snapshot)
            .await
            .map_err(|_| HubError::Stopped)
    }

    /// Number of subscribers as of the hub's last processed event
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotPublisher for HubHandle {
    async fn publish(&self, snapshot: Vec<Instrument>) -> Result<(), PublishError> {
        HubHandle::publish(self, snapshot)
            .await
            .map_err(|_| PublishError::Closed)
    }
}

/// Receiving end of one subscriber. Dropping it unregisters the subscriber.
pub struct Subscription {
    id: SubscriberId,
    rx: mpsc::Receiver<Payload>,
    unregister_tx: mpsc::UnboundedSender<SubscriberId>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next payload; `None` once the hub has dropped this subscriber
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Stop accepting payloads without unregistering. The hub notices on its
    /// next publish and evicts the subscriber.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.unregister_tx.send(self.id);
    }
}
