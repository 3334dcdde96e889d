mod instrument;
mod order;
mod side;

pub use instrument::{Instrument, percent_change};
pub use order::{Order, OrderId, OrderRequest, OrderValidationError, OrderValidator};
pub use side::Side;
