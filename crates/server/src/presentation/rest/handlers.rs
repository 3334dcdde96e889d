use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use tickerhub_clock::Clock;
use tickerhub_core::{Instrument, Order, OrderRequest};

use crate::application::ports::{InstrumentRepository, OrderRepository};
use crate::application::SubmitOrderUseCase;
use crate::presentation::rest::{ApiError, dto::*};

use super::AppState;

/// GET /prices
pub async fn get_prices<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Json<Vec<Instrument>> {
    Json(state.store.snapshot_instruments())
}

/// POST /orders
pub async fn create_order<C: Clock>(
    State(state): State<Arc<AppState<C>>>,
    payload: Result<Json<OrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let Json(request) = payload?;

    let use_case = SubmitOrderUseCase::new(Arc::clone(&state.clock), Arc::clone(&state.store));
    let order = use_case.execute(request)?;

    Ok((StatusCode::CREATED, Json(order)))
}

/// GET /orders
pub async fn list_orders<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Json<Vec<Order>> {
    Json(state.store.snapshot_orders())
}

/// GET /health
pub async fn health<C: Clock>(State(state): State<Arc<AppState<C>>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        subscribers: state.hub.subscriber_count(),
        instruments: state.store.instrument_count(),
        orders: state.store.order_count(),
    })
}
