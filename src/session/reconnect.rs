//! Reconnect policy for sessions that drop for transient reasons.
//!
//! Exponential backoff with a cap on both the delay and the number of
//! consecutive attempts. A successful connection resets the count.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Configuration for reconnection behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Delay before the first retry (in milliseconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Maximum delay between retries (in milliseconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Maximum number of consecutive attempts before the session is marked failed
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Multiplier for exponential backoff
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Jitter factor (0.0 - 1.0) to spread out simultaneous reconnects
    #[serde(default = "default_jitter")]
    pub jitter_factor: f64,
}

const fn default_initial_delay() -> u64 {
    1000
}

const fn default_max_delay() -> u64 {
    60_000
}

const fn default_max_attempts() -> u32 {
    10
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_jitter() -> f64 {
    0.1
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: default_max_attempts(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter_factor: default_jitter(),
        }
    }
}

impl ReconnectConfig {
    /// Retry immediately, up to `max_attempts` times.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            initial_delay_ms: 0,
            max_delay_ms: 0,
            max_attempts,
            backoff_multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Delay before the given attempt (1-based), or `None` once the budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(self.calculate_delay(attempt - 1))
    }

    /// Backoff for a 0-based retry index.
    #[allow(clippy::cast_precision_loss)]
    fn calculate_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.min(30)).unwrap_or(30);
        let base_delay = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped_delay = base_delay.min(self.max_delay_ms as f64);

        // Random jitter in [-range, +range], drawn per call.
        let jitter_range = capped_delay * self.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-1.0..=1.0) * jitter_range
        } else {
            0.0
        };

        let final_delay = (capped_delay + jitter).max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_millis(final_delay as u64)
    }
}
