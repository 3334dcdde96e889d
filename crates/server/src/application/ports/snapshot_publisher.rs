use async_trait::async_trait;
use thiserror::Error;
use tickerhub_core::Instrument;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("Snapshot consumer has stopped")]
    Closed,
}

/// Downstream sink for instrument snapshots
///
/// Feeds push every snapshot they produce through this port; they never
/// know who consumes it.
#[async_trait]
pub trait SnapshotPublisher: Send + Sync {
    async fn publish(&self, snapshot: Vec<Instrument>) -> Result<(), PublishError>;
}
