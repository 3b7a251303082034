//! Scheduling settings for a process pool.

use std::time::Duration;

use nix::sys::signal::Signal;
use serde::{Deserialize, Serialize};

use crate::defaults::{
    default_concurrency, default_poll_interval_ms, default_stop_signal, default_stop_timeout_ms,
};
use crate::error::ConfigError;

/// Values the pool scheduler consumes.
///
/// Durations are stored as whole milliseconds so documents stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
    #[serde(default = "default_stop_timeout_ms")]
    stop_timeout_ms: u64,
    #[serde(default = "default_stop_signal")]
    stop_signal: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            stop_signal: default_stop_signal(),
        }
    }
}

impl PoolConfig {
    /// Creates settings with the given concurrency and default timings.
    #[must_use]
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// Overrides the poll interval, saturating at `u64::MAX` milliseconds.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = saturating_millis(interval);
        self
    }

    /// Overrides the stop grace period.
    #[must_use]
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout_ms = saturating_millis(timeout);
        self
    }

    /// Overrides the stop signal.
    #[must_use]
    pub fn with_stop_signal(mut self, signal: Signal) -> Self {
        self.stop_signal = signal.as_str().to_owned();
        self
    }

    /// Maximum number of concurrently running children.
    #[must_use]
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Interval between scheduling ticks while waiting.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Grace period between the stop signal and a forced kill.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    /// Signal used to request a graceful stop.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSignal`] if the configured name is not a
    /// signal known to the platform.
    pub fn stop_signal(&self) -> Result<Signal, ConfigError> {
        self.stop_signal
            .parse::<Signal>()
            .map_err(|_| ConfigError::UnknownSignal {
                name: self.stop_signal.clone(),
            })
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConcurrency`] for a zero concurrency,
    /// [`ConfigError::ZeroPollInterval`] for a zero poll interval and
    /// [`ConfigError::UnknownSignal`] for an unparseable stop signal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency {
                value: self.concurrency,
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        self.stop_signal().map(|_| ())
    }
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
