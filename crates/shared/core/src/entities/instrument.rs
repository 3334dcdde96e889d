use serde::{Deserialize, Serialize};

use crate::values::{Price, Symbol};

/// Percentage move from `old` to `new`.
///
/// Returns `None` when `old` is zero, since the change is undefined there.
pub fn percent_change(old: Price, new: Price) -> Option<f64> {
    if old == 0.0 {
        return None;
    }
    Some((new - old) / old * 100.0)
}

/// Current state of a tradable instrument
///
/// `last_change` is the percentage change relative to the immediately
/// preceding price, not a session or daily change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: Symbol,
    pub price: Price,
    pub last_change: f64,
}

impl Instrument {
    /// First observation of a symbol: no prior price, so no change yet
    pub fn new(symbol: impl Into<Symbol>, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            last_change: 0.0,
        }
    }

    /// Move to a new price, recomputing `last_change`.
    ///
    /// When the current price is zero the previous `last_change` is kept.
    pub fn apply_price(&mut self, new_price: Price) {
        if let Some(change) = percent_change(self.price, new_price) {
            self.last_change = change;
        }
        self.price = new_price;
    }
}
