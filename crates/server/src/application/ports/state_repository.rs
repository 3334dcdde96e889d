use tickerhub_core::{Instrument, Order, Price, Symbol};

/// Read/write access to current instrument prices
///
/// Implementations hand out owned copies only; nothing returned here may
/// alias the stored state.
pub trait InstrumentRepository: Send + Sync {
    /// Apply a new price observation, creating the instrument on first sight
    fn update_price(&self, symbol: &str, price: Price);

    /// Point-in-time copy of every instrument
    fn snapshot_instruments(&self) -> Vec<Instrument>;

    /// Copy of a single instrument
    fn instrument(&self, symbol: &str) -> Option<Instrument>;

    fn instrument_count(&self) -> usize;

    /// Seed initial prices if and only if no instrument exists yet.
    /// Returns true when seeding happened.
    fn seed_if_empty(&self, seeds: &[(Symbol, Price)]) -> bool;
}

/// Append-only order history
pub trait OrderRepository: Send + Sync {
    /// Append an already validated order
    fn append_order(&self, order: Order);

    /// Copy of all orders in acceptance order
    fn snapshot_orders(&self) -> Vec<Order>;

    fn order_count(&self) -> usize;
}
