//! Errors raised while validating configuration.

use thiserror::Error;

/// A configuration value is outside its legal range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The concurrency limit must be at least one.
    #[error("concurrency limit must be greater than 0, got {value}")]
    InvalidConcurrency {
        /// Rejected value.
        value: usize,
    },

    /// The poll interval must be non-zero.
    #[error("poll interval must be greater than 0ms")]
    ZeroPollInterval,

    /// The stop signal name is not a known signal.
    #[error("unknown stop signal '{name}'")]
    UnknownSignal {
        /// Rejected signal name.
        name: String,
    },

    /// The log filter was empty.
    #[error("log filter must not be empty")]
    EmptyLogFilter,
}
