use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tickerhub_core::Timestamp;

use crate::Clock;

/// Clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    time: RwLock<Timestamp>,
}

impl FixedClock {
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            time: RwLock::new(time),
        }
    }

    /// Frozen at the Unix epoch
    pub fn epoch() -> Self {
        Self::at(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn set(&self, time: Timestamp) {
        *self.time.write() = time;
    }

    pub fn advance(&self, by: Duration) {
        let mut time = self.time.write();
        *time += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.time.read()
    }

    fn name(&self) -> &str {
        "FixedClock"
    }
}
