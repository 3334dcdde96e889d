use std::time::Duration;

use crate::infrastructure::config::ReconnectConfig;

/// Capped exponential backoff with an attempt counter
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    max_attempts: Option<u32>,
    current: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, max_attempts: Option<u32>) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            max_attempts,
            current: initial,
            attempt: 0,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(
            config.initial_delay(),
            config.max_delay(),
            config.max_attempts,
        )
    }

    /// Delay before the next attempt, or `None` once attempts are exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(limit) = self.max_attempts {
            if self.attempt >= limit {
                return None;
            }
        }

        let delay = self.current;
        self.attempt += 1;
        self.current = (self.current * 2).min(self.max);
        Some(delay)
    }

    /// Forget past failures after a healthy session
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.attempt = 0;
    }

    /// Consecutive failures since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
