//! Default values shared by the configuration structs.

use crate::logging::LogFormat;

/// Default number of concurrently running children.
pub const DEFAULT_CONCURRENCY: usize = 1;

/// Default liveness poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Default grace period before a stopping child is killed, in milliseconds.
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 10_000;

/// Default signal sent to ask a child to stop.
pub const DEFAULT_STOP_SIGNAL: &str = "SIGTERM";

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default number of concurrently running children.
#[must_use]
pub const fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Default liveness poll interval in milliseconds.
#[must_use]
pub const fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Default stop grace period in milliseconds.
#[must_use]
pub const fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT_MS
}

/// Owned default stop signal name used where allocation is required.
#[must_use]
pub fn default_stop_signal() -> String {
    DEFAULT_STOP_SIGNAL.to_owned()
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
