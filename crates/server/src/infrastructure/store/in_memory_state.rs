use parking_lot::RwLock;
use std::collections::BTreeMap;
use tickerhub_core::{Instrument, Order, Price, Symbol};

use crate::application::ports::{InstrumentRepository, OrderRepository};

/// In-memory authoritative state: instrument prices plus the order log
///
/// One read-write lock guards both structures. Every mutation takes the
/// write half, every read takes the read half for the duration of a copy.
/// Instruments are kept in a sorted map, so snapshots enumerate by symbol.
pub struct InMemoryStateStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    instruments: BTreeMap<Symbol, Instrument>,
    orders: Vec<Order>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        InMemoryStateStore {
            inner: RwLock::new(StoreState::default()),
        }
    }

    /// Store pre-populated with the given prices
    pub fn with_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Price)>,
        S: Into<Symbol>,
    {
        let store = Self::new();
        for (symbol, price) in prices {
            let symbol = symbol.into();
            store.update_price(&symbol, price);
        }
        store
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InstrumentRepository for InMemoryStateStore {
    fn update_price(&self, symbol: &str, price: Price) {
        let mut state = self.inner.write();
        match state.instruments.get_mut(symbol) {
            Some(instrument) => instrument.apply_price(price),
            None => {
                state
                    .instruments
                    .insert(symbol.to_string(), Instrument::new(symbol, price));
            }
        }
    }

    fn snapshot_instruments(&self) -> Vec<Instrument> {
        self.inner.read().instruments.values().cloned().collect()
    }

    fn instrument(&self, symbol: &str) -> Option<Instrument> {
        self.inner.read().instruments.get(symbol).cloned()
    }

    fn instrument_count(&self) -> usize {
        self.inner.read().instruments.len()
    }

    fn seed_if_empty(&self, seeds: &[(Symbol, Price)]) -> bool {
        let mut state = self.inner.write();
        if !state.instruments.is_empty() {
            return false;
        }
        for (symbol, price) in seeds {
            state
                .instruments
                .insert(symbol.clone(), Instrument::new(symbol.clone(), *price));
        }
        true
    }
}

impl OrderRepository for InMemoryStateStore {
    fn append_order(&self, order: Order) {
        self.inner.write().orders.push(order);
    }

    fn snapshot_orders(&self) -> Vec<Order> {
        self.inner.read().orders.clone()
    }

    fn order_count(&self) -> usize {
        self.inner.read().orders.len()
    }
}
