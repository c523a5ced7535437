//! Bounded retry with exponential backoff for transient source conditions

use pcmx_common::config::SourceConfig;
use std::time::Duration;

/// How long, and how often, to wait on a source that is not ready
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed for one pull before giving up
    pub max_attempts: u32,

    /// Wait before the first retry
    pub initial_delay: Duration,

    /// Ceiling for any single wait
    pub max_delay: Duration,

    /// Growth factor between consecutive waits
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Policy that retries immediately, used where waiting is pointless (tests)
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Wait before retry number `attempt` (0-based), capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let delay = self.initial_delay.as_secs_f64() * factor;
        if delay >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(delay)
    }

    /// Successive waits, one per allowed retry
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_attempts).map(move |attempt| self.delay_for(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SourceConfig::default())
    }
}

impl From<&SourceConfig> for RetryPolicy {
    fn from(config: &SourceConfig) -> Self {
        Self {
            max_attempts: config.retry_max_attempts,
            initial_delay: config.initial_delay(),
            max_delay: config.max_delay(),
            multiplier: 2.0,
        }
    }
}
