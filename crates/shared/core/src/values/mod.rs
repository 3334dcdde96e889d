use chrono::{DateTime, Utc};

/// Price value. Instruments and orders carry plain floating point prices.
pub type Price = f64;

/// Order quantity in whole units
pub type Quantity = i64;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Symbol identifier for an instrument (e.g. "AAPL", "BINANCE:BTCUSDT")
pub type Symbol = String;
