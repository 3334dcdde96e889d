//! tickerhub server
//!
//! A real-time market data relay: a price feed writes into an in-memory
//! store, every change is fanned out as a full snapshot to WebSocket
//! subscribers, and a small REST surface reads prices and accepts orders.
//!
//! # Architecture
//!
//! - **Application**: port traits (repositories, snapshot publisher, price
//!   feed) and the order submission use case
//! - **Infrastructure**: the state store, the broadcast hub, the simulated
//!   and external feeds, configuration
//! - **Presentation**: axum REST handlers and the WebSocket endpoint
//!
//! # Example
//!
//! ```ignore
//! use tickerhub_server::{ServerConfig, TickerHub, shutdown_channel};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let (_trigger, shutdown) = shutdown_channel();
//!     TickerHub::new(ServerConfig::default()).run(shutdown).await
//! }
//! ```

pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod shutdown;

pub use tickerhub_clock::{Clock, FixedClock, SystemClock};
pub use tickerhub_core::{Instrument, Order, OrderRequest, Side};

pub use application::{
    InstrumentRepository, OrderRepository, PriceFeed, PublishError, SnapshotPublisher,
    SubmitOrderError, SubmitOrderUseCase,
};
pub use infrastructure::{
    BroadcastHub, ConfigError, ExternalFeed, FeedKind, HubHandle, InMemoryStateStore,
    ServerConfig, SimulatedFeed, select_feed,
};
pub use presentation::{AppState, create_router};
pub use shutdown::{Shutdown, ShutdownTrigger, shutdown_channel};

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// The assembled server: store, hub, feed and HTTP surface
pub struct TickerHub<C: Clock + 'static> {
    pub config: ServerConfig,
    pub clock: Arc<C>,
    pub store: Arc<InMemoryStateStore>,
    hub: BroadcastHub,
    hub_handle: HubHandle,
}

impl<C: Clock + 'static> TickerHub<C> {
    /// Create a server with the given clock
    pub fn with_clock(config: ServerConfig, clock: Arc<C>) -> Self {
        let store = Arc::new(InMemoryStateStore::new());
        let (hub, hub_handle) = BroadcastHub::new(&config.hub);

        TickerHub {
            config,
            clock,
            store,
            hub,
            hub_handle,
        }
    }

    /// Handle onto the hub, usable before the server runs
    pub fn hub_handle(&self) -> HubHandle {
        self.hub_handle.clone()
    }

    /// Create the HTTP router
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState::new(
            Arc::clone(&self.clock),
            Arc::clone(&self.store),
            self.hub_handle.clone(),
            self.config.hub.write_timeout(),
        ));

        create_router(state)
    }

    /// Bind the configured address and serve until `shutdown` fires
    pub async fn run(self, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    ///
    /// Starts the hub loop and the configured feed alongside the HTTP
    /// server. All three stop once `shutdown` fires.
    pub async fn serve(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let router = self.router();
        let TickerHub {
            config,
            store,
            hub,
            hub_handle,
            ..
        } = self;

        let hub_task = tokio::spawn(hub.run(shutdown.clone()));

        let mut feed = select_feed(&config, store, Arc::new(hub_handle));
        let feed_shutdown = shutdown.clone();
        let feed_task = tokio::spawn(async move { feed.run(feed_shutdown).await });

        info!(addr = %listener.local_addr()?, "tickerhub listening");
        info!("  GET  /prices");
        info!("  GET  /orders");
        info!("  POST /orders");
        info!("  GET  /health");
        info!("  GET  /ws");

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.clone().wait_owned())
            .await;

        feed_task.abort();
        if shutdown.is_triggered() {
            let _ = hub_task.await;
        } else {
            hub_task.abort();
        }

        info!("tickerhub stopped");
        served
    }
}

impl TickerHub<SystemClock> {
    /// Create a server on wall-clock time
    pub fn new(config: ServerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }
}
