//! Price feeds
//!
//! Exactly one feed runs per process, chosen from configuration at startup.

mod backoff;
mod external;
mod simulated;

pub use backoff::Backoff;
pub use external::{ExternalFeed, FeedError};
pub use simulated::SimulatedFeed;

use std::sync::Arc;
use tracing::info;

use crate::application::ports::{InstrumentRepository, PriceFeed, SnapshotPublisher};
use crate::infrastructure::config::{FeedKind, ServerConfig};

/// Build the feed selected by `config`
pub fn select_feed<S, P>(config: &ServerConfig, store: Arc<S>, publisher: Arc<P>) -> Box<dyn PriceFeed>
where
    S: InstrumentRepository + 'static,
    P: SnapshotPublisher + 'static,
{
    let feed: Box<dyn PriceFeed> = match config.feed_kind() {
        FeedKind::External => Box::new(ExternalFeed::new(
            store,
            publisher,
            config.external_feed.clone(),
        )),
        FeedKind::Simulated => Box::new(SimulatedFeed::new(
            store,
            publisher,
            config.simulation.clone(),
        )),
    };

    info!(feed = feed.name(), "Price feed selected");
    feed
}
