use std::sync::Arc;
use thiserror::Error;
use tickerhub_clock::Clock;
use tickerhub_core::{Order, OrderRequest, OrderValidationError};
use tracing::info;

use crate::application::ports::OrderRepository;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SubmitOrderError {
    #[error(transparent)]
    Invalid(#[from] OrderValidationError),
}

/// Validate a submission, stamp it and append it to the order log
pub struct SubmitOrderUseCase<C, O>
where
    C: Clock,
    O: OrderRepository,
{
    clock: Arc<C>,
    order_repo: Arc<O>,
}

impl<C, O> SubmitOrderUseCase<C, O>
where
    C: Clock,
    O: OrderRepository,
{
    pub fn new(clock: Arc<C>, order_repo: Arc<O>) -> Self {
        Self { clock, order_repo }
    }

    /// Rejected submissions leave the order log untouched
    pub fn execute(&self, request: OrderRequest) -> Result<Order, SubmitOrderError> {
        let order = Order::accept(request, self.clock.now())?;
        self.order_repo.append_order(order.clone());

        info!(
            order_id = %order.id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            price = order.price,
            "Order accepted"
        );

        Ok(order)
    }
}
