#![expect(
    clippy::module_name_repetitions,
    reason = "Configuration types intentionally mirror the module name for clarity"
)]

use std::time::Duration;

use crate::Result;
use crate::error::Error;

const DEFAULT_HANDSHAKE_TIMEOUT_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_CLOSE_TIMEOUT_DURATION: Duration = Duration::from_secs(2);
const DEFAULT_MISSED_HEARTBEAT_LIMIT: u32 = 2;
const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;
const DEFAULT_BACKOFF_JITTER: f64 = 0.5;

/// Configuration for gateway socket behavior.
///
/// The heartbeat interval is not configurable: the remote dictates it in its
/// Hello frame.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum time from opening the transport to reaching `Ready`
    pub handshake_timeout: Duration,
    /// Maximum time `disconnect` waits for the remote to acknowledge the close
    pub close_timeout: Duration,
    /// Consecutive unacknowledged heartbeats after which the connection is
    /// considered a zombie and reconnected. `None` disables the check.
    pub missed_heartbeat_limit: Option<u32>,
    /// Reconnection strategy configuration
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT_DURATION,
            close_timeout: DEFAULT_CLOSE_TIMEOUT_DURATION,
            missed_heartbeat_limit: Some(DEFAULT_MISSED_HEARTBEAT_LIMIT),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.handshake_timeout.is_zero() {
            return Err(Error::validation("handshake_timeout must be positive"));
        }
        if self.missed_heartbeat_limit == Some(0) {
            return Err(Error::validation(
                "missed_heartbeat_limit must be at least 1 (use None to disable)",
            ));
        }
        self.reconnect.validate()
    }
}

/// Configuration for automatic reconnection behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts before giving up.
    /// `None` means infinite retries.
    pub max_attempts: Option<u32>,
    /// Base delay of the first reconnection attempt
    pub initial_backoff: Duration,
    /// Hard ceiling for any reconnection delay
    pub max_backoff: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Upper bound of the random extra delay, as a fraction of the base delay.
    /// Must not exceed `backoff_multiplier - 1` so delays never shrink.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: None, // Infinite reconnection by default
            initial_backoff: DEFAULT_INITIAL_BACKOFF_DURATION,
            max_backoff: DEFAULT_MAX_BACKOFF_DURATION,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

impl ReconnectConfig {
    #[expect(
        clippy::float_arithmetic,
        reason = "Bounds check on the configured backoff shape"
    )]
    pub(crate) fn validate(&self) -> Result<()> {
        if self.initial_backoff.is_zero() {
            return Err(Error::validation("initial_backoff must be positive"));
        }
        if self.max_backoff < self.initial_backoff {
            return Err(Error::validation(
                "max_backoff must not be smaller than initial_backoff",
            ));
        }
        if !(self.backoff_multiplier >= 1.0) {
            return Err(Error::validation("backoff_multiplier must be at least 1.0"));
        }
        if !(0.0..=self.backoff_multiplier - 1.0).contains(&self.jitter) {
            return Err(Error::validation(format!(
                "jitter must be within [0, {}]",
                self.backoff_multiplier - 1.0
            )));
        }
        Ok(())
    }
}
