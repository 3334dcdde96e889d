use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::Side;
use crate::values::{Price, Quantity, Symbol, Timestamp};

/// Unique identifier for an order
pub type OrderId = Uuid;

/// Order submission as received from a client.
///
/// `side` stays a raw string so that an unknown side is reported as a
/// validation failure rather than a decoding failure. Any `id` or
/// `timestamp` fields the client sends are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: String,
    pub quantity: Quantity,
    pub price: Price,
}

impl OrderRequest {
    pub fn new(
        symbol: impl Into<Symbol>,
        side: impl Into<String>,
        quantity: Quantity,
        price: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side: side.into(),
            quantity,
            price,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderValidationError {
    #[error("Symbol cannot be empty")]
    EmptySymbol,

    #[error("Invalid side '{0}': must be buy or sell")]
    InvalidSide(String),

    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(Quantity),

    #[error("Price must be positive, got {0}")]
    NonPositivePrice(Price),
}

/// Stateless field checks for order submissions
pub struct OrderValidator;

impl OrderValidator {
    /// Validate a submission, returning the parsed side on success
    pub fn validate(request: &OrderRequest) -> Result<Side, OrderValidationError> {
        if request.symbol.is_empty() {
            return Err(OrderValidationError::EmptySymbol);
        }

        let side = Side::try_from(request.side.as_str())
            .map_err(|_| OrderValidationError::InvalidSide(request.side.clone()))?;

        if request.quantity <= 0 {
            return Err(OrderValidationError::NonPositiveQuantity(request.quantity));
        }

        if !request.price.is_finite() || request.price <= 0.0 {
            return Err(OrderValidationError::NonPositivePrice(request.price));
        }

        Ok(side)
    }
}

/// An accepted order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub quantity: Quantity,
    pub price: Price,
    pub timestamp: Timestamp,
}

impl Order {
    /// Validate a submission and stamp it with a fresh id and the given time
    pub fn accept(
        request: OrderRequest,
        timestamp: Timestamp,
    ) -> Result<Self, OrderValidationError> {
        let side = OrderValidator::validate(&request)?;

        Ok(Self {
            id: Uuid::new_v4(),
            symbol: request.symbol,
            side,
            quantity: request.quantity,
            price: request.price,
            timestamp,
        })
    }
}
