//! tickerhub Clock
//!
//! Time abstraction used to stamp accepted orders:
//!
//! - [`SystemClock`]: wall-clock time for production
//! - [`FixedClock`]: frozen, manually advanced time for deterministic tests
//!
//! ```ignore
//! use tickerhub_clock::{Clock, FixedClock};
//! use chrono::Duration;
//!
//! let clock = FixedClock::epoch();
//! let t0 = clock.now();
//! clock.advance(Duration::seconds(5));
//! assert_eq!(clock.now() - t0, Duration::seconds(5));
//! ```

mod fixed;
mod system;

pub use fixed::FixedClock;
pub use system::SystemClock;

use tickerhub_core::Timestamp;

/// Port for time abstraction
///
/// This allows the system to use different time sources:
/// - Real system time for production
/// - Fixed time for deterministic tests
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }
}
