//! Reconnect delay policy.
//!
//! Delays grow exponentially from `initial_backoff`, with a random extra of
//! up to `jitter` times the base delay, and are clamped to `max_backoff`.
//! Because `jitter <= multiplier - 1`, the largest possible delay of attempt
//! `n` never exceeds the smallest possible delay of attempt `n + 1`, so the
//! sequence is non-decreasing until it reaches the ceiling.

use std::time::Duration;

use backoff::backoff::Backoff;
use rand::Rng as _;

use super::config::ReconnectConfig;
use crate::Result;
use crate::error::Error;

/// Stateful reconnect policy tracking the number of consecutive failed attempts.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempt: u32,
}

impl ReconnectPolicy {
    /// Fails with a validation error when `config` could yield shrinking delays.
    pub fn new(config: ReconnectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, attempt: 0 })
    }

    /// Number of reconnection attempts scheduled since the last `Ready`.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay before reconnection attempt number `attempt`.
    ///
    /// Attempt `0` is the remote-requested reconnect and is immediate; every
    /// later attempt waits at least `initial_backoff`.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        reason = "Exponential growth and jitter are computed in seconds"
    )]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.config.initial_backoff.as_secs_f64()
            * self.config.backoff_multiplier.powi(exponent);
        let ceiling = self.config.max_backoff.as_secs_f64();

        if !base.is_finite() || base >= ceiling {
            return self.config.max_backoff;
        }

        let extra = if self.config.jitter > 0.0 {
            rand::rng().random_range(0.0..self.config.jitter) * base
        } else {
            0.0
        };

        Duration::from_secs_f64((base + extra).min(ceiling))
    }

    /// Count one more attempt and return its delay, or `None` once
    /// `max_attempts` is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_attempts
            && self.attempt >= max
        {
            return None;
        }

        self.attempt = self.attempt.saturating_add(1);
        Some(self.delay_for(self.attempt))
    }
}

impl TryFrom<ReconnectConfig> for ReconnectPolicy {
    type Error = Error;

    fn try_from(config: ReconnectConfig) -> Result<Self> {
        Self::new(config)
    }
}

impl Backoff for ReconnectPolicy {
    fn next_backoff(&mut self) -> Option<Duration> {
        self.next_delay()
    }

    fn reset(&mut self) {
        self.attempt = 0;
    }
}
