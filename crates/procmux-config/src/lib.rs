//! Configuration consumed by pool controllers.
//!
//! The pool itself only reads a handful of values: how many children may run
//! at once, how often liveness is polled, and how children are asked to stop.
//! Logging settings live alongside them so a controller binary can initialise
//! telemetry from the same document.
//!
//! Every struct deserialises with `serde` and falls back to the defaults in
//! [`defaults`] for missing fields, so any serde format (JSON, TOML, YAML)
//! can supply a partial document.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use procmux_config::{Config, LogFormat};
//!
//! let config: Config = serde_json::from_str(
//!     r#"{ "pool": { "concurrency": 4 }, "logging": { "format": "compact" } }"#,
//! ).expect("valid document");
//! config.validate().expect("valid values");
//!
//! assert_eq!(config.pool().concurrency(), 4);
//! assert_eq!(config.pool().poll_interval(), Duration::from_millis(300));
//! assert_eq!(config.logging().format(), LogFormat::Compact);
//! ```

pub mod defaults;
mod error;
mod logging;
mod pool;

pub use self::defaults::{
    DEFAULT_CONCURRENCY, DEFAULT_LOG_FILTER, DEFAULT_POLL_INTERVAL_MS, DEFAULT_STOP_SIGNAL,
    DEFAULT_STOP_TIMEOUT_MS,
};
pub use self::error::ConfigError;
pub use self::logging::{LogFormat, LogFormatParseError, LoggingConfig};
pub use self::pool::PoolConfig;

use serde::{Deserialize, Serialize};

/// Complete controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pool: PoolConfig,
    logging: LoggingConfig,
}

impl Config {
    /// Creates a configuration from its parts.
    #[must_use]
    pub const fn new(pool: PoolConfig, logging: LoggingConfig) -> Self {
        Self { pool, logging }
    }

    /// Returns the pool settings.
    #[must_use]
    pub const fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    /// Returns the logging settings.
    #[must_use]
    pub const fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Checks every value for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;
        self.logging.validate()
    }
}
