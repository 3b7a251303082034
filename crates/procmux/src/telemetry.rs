//! Structured telemetry initialisation for pool controllers.
//!
//! The library only emits `tracing` events under the `procmux::*` targets.
//! Controllers that want them on stderr call [`initialise`] once with the
//! logging section of their configuration.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use procmux_config::{LogFormat, LoggingConfig};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Later calls return a fresh [`TelemetryHandle`] without touching the
/// global state again.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the filter directive does not
/// parse and [`TelemetryError::Subscriber`] when another subscriber was
/// already installed by someone else.
///
/// # Examples
///
/// ```rust
/// use procmux::telemetry;
/// use procmux_config::LoggingConfig;
///
/// # fn main() -> Result<(), procmux::telemetry::TelemetryError> {
/// let config = LoggingConfig::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
pub fn initialise(config: &LoggingConfig) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|()| TelemetryHandle)
}

fn parse_filter(directive: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directive).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(config: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = parse_filter(config.filter())?;

    let builder = |env_filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::level("info")]
    #[case::targeted("procmux::pool=debug,procmux::router=trace")]
    fn accepts_filter_directives(#[case] directive: &str) {
        assert!(parse_filter(directive).is_ok());
    }

    #[test]
    fn rejects_malformed_filter_directives() {
        let error = parse_filter("procmux=notalevel").expect_err("invalid directive");

        assert!(matches!(error, TelemetryError::Filter(_)));
        assert!(error.to_string().starts_with("invalid log filter"));
    }

    #[test]
    fn initialise_is_idempotent() {
        let config = LoggingConfig::new("warn", LogFormat::Compact);

        initialise(&config).expect("first initialisation");
        initialise(&config).expect("second initialisation");
    }
}
