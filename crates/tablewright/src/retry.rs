//! Bounded retry policy for interactions blocked by transient overlays.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default attempts per interaction
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the first retry (250ms)
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;

/// Default upper bound on any single delay (2s)
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff_ms: u64,
    /// Growth factor applied after each retry
    pub multiplier: f64,
    /// Upper bound on a single delay
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            multiplier: 2.0,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Policy with the given attempt budget and default backoff
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Policy retrying immediately (tests, local fixtures)
    #[must_use]
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff_ms: 0,
            multiplier: 1.0,
            max_backoff_ms: 0,
        }
    }

    /// Set the initial backoff
    #[must_use]
    pub const fn with_initial_backoff(mut self, backoff_ms: u64) -> Self {
        self.initial_backoff_ms = backoff_ms;
        self
    }

    /// Set the backoff multiplier
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Whether another attempt is allowed after `attempts_made`
    #[must_use]
    pub const fn allows_retry(&self, attempts_made: u32) -> bool {
        attempts_made < self.max_attempts
    }

    /// Delay to sleep after failed attempt number `attempt` (1-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32);
        let factor = self.multiplier.max(1.0).powi(exponent as i32);
        let millis = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(millis as u64)
    }
}
