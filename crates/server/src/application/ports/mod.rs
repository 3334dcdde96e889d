mod price_feed;
mod snapshot_publisher;
mod state_repository;

pub use price_feed::PriceFeed;
pub use snapshot_publisher::{PublishError, SnapshotPublisher};
pub use state_repository::{InstrumentRepository, OrderRepository};
