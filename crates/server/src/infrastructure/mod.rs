pub mod config;
pub mod feeds;
pub mod hub;
pub mod store;

pub use config::{
    ConfigError, ExternalFeedConfig, FeedKind, HubConfig, ReconnectConfig, SeedPrice, ServerConfig,
    SimulationConfig,
};
pub use feeds::{Backoff, ExternalFeed, FeedError, SimulatedFeed, select_feed};
pub use hub::{BroadcastHub, HubError, HubHandle, Payload, SubscriberId, Subscription};
pub use store::InMemoryStateStore;
