//! tickerhub Core Domain
//!
//! Pure domain types for the tickerhub price streaming service.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    Instrument, Order, OrderId, OrderRequest, OrderValidationError, OrderValidator, Side,
    percent_change,
};
pub use values::{Price, Quantity, Symbol, Timestamp};
