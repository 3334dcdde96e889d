use axum::{Router, routing::get};
use std::sync::Arc;
use std::time::Duration;
use tickerhub_clock::Clock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::infrastructure::{HubHandle, InMemoryStateStore};
use crate::presentation::websocket::ws_handler;

/// Application state shared across handlers - uses concrete infrastructure types
pub struct AppState<C: Clock> {
    pub clock: Arc<C>,
    pub store: Arc<InMemoryStateStore>,
    pub hub: HubHandle,
    /// Upper bound on a single WebSocket write
    pub write_timeout: Duration,
}

impl<C: Clock> AppState<C> {
    pub fn new(
        clock: Arc<C>,
        store: Arc<InMemoryStateStore>,
        hub: HubHandle,
        write_timeout: Duration,
    ) -> Self {
        AppState {
            clock,
            store,
            hub,
            write_timeout,
        }
    }
}

/// Create the HTTP router, WebSocket endpoint included
pub fn create_router<C: Clock + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/prices", get(handlers::get_prices::<C>))
        .route(
            "/orders",
            get(handlers::list_orders::<C>).post(handlers::create_order::<C>),
        )
        .route("/health", get(handlers::health::<C>))
        .route("/ws", get(ws_handler::<C>))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
