//! Error taxonomy for routing, process control and scheduling.
//!
//! All errors use `thiserror`-derived enums with structured context so
//! callers can inspect the failure programmatically. I/O errors are wrapped in
//! `Arc` to keep the types cloneable and small.
//!
//! | Failure | Type |
//! |---|---|
//! | malformed wire content | [`RouterError::Decoding`] |
//! | unknown message type | [`RouterError::Protocol`] |
//! | child-reported failure without a handler | [`RouterError::ChildFailure`] |
//! | invalid pool usage | [`ConfigurationError`] |
//! | process control | [`ProcessError`] |

use std::io;
use std::sync::Arc;

use nix::errno::Errno;
use nix::sys::signal::Signal;
use thiserror::Error;

use procmux_protocol::{CodecError, ExceptionEnvelope};

use crate::process::StreamKind;

/// Errors raised while turning a child's output into dispatched messages.
///
/// None of these are retried. The router leaves the child running; deciding
/// whether to stop it is up to the caller.
#[derive(Debug, Error)]
pub enum RouterError {
    /// A line could not be decoded.
    #[error(
        "error decoding message from '{label}' with {codec}: {source}\nchunk contents:\n{}",
        .context.join("\n")
    )]
    Decoding {
        /// Label of the emitting process.
        label: String,
        /// Name of the codec that rejected the line.
        codec: &'static str,
        /// The offending line, trimmed.
        line: String,
        /// Every line of the chunk that contained the offending line.
        context: Box<[String]>,
        /// Underlying codec failure.
        #[source]
        source: CodecError,
    },

    /// A well-formed message carried an unrecognised type tag.
    #[error("'{label}' sent unknown message type '{tag}' on {stream}")]
    Protocol {
        /// Label of the emitting process.
        label: String,
        /// Stream the message arrived on.
        stream: StreamKind,
        /// Unrecognised tag.
        tag: String,
    },

    /// The child reported a failure and no exception handler was registered.
    #[error("child '{label}' failed: {envelope}")]
    ChildFailure {
        /// Label of the emitting process.
        label: String,
        /// Failure reported by the child.
        envelope: Box<ExceptionEnvelope>,
    },
}

/// Errors raised by process handles.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The child process could not be spawned.
    #[error("process '{label}' failed to start {program}: {source}")]
    Spawn {
        /// Process label.
        label: String,
        /// Program that was executed.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// An I/O error occurred while supervising the process.
    #[error("I/O error supervising process '{label}': {source}")]
    Io {
        /// Process label.
        label: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A signal could not be delivered.
    #[error("failed to send {signal} to process '{label}': {source}")]
    Signal {
        /// Process label.
        label: String,
        /// Signal that was sent.
        signal: Signal,
        /// Underlying errno.
        #[source]
        source: Errno,
    },

    /// The process output could not be routed.
    #[error(transparent)]
    Delivery(#[from] RouterError),

    /// `start` was called more than once.
    #[error("process '{label}' was already started")]
    AlreadyStarted {
        /// Process label.
        label: String,
    },

    /// The operation is not allowed while the process is alive.
    #[error("process '{label}' is still running")]
    StillRunning {
        /// Process label.
        label: String,
    },
}

/// Misuse of the pool contract. Always fatal and raised immediately.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The concurrency limit must be at least one.
    #[error("concurrency limit must be greater than 0, got {value}")]
    InvalidConcurrency {
        /// Rejected value.
        value: usize,
    },

    /// The work source yielded a handle that cannot be started by the pool.
    #[error("work source yielded process '{label}' that was already started")]
    StartedHandle {
        /// Label of the rejected handle.
        label: String,
    },

    /// The finish hook returned a replacement that is not running.
    #[error("finish hook for slot {slot} returned process '{label}' that is not running")]
    ReplacementNotRunning {
        /// Slot the replacement was meant for.
        slot: usize,
        /// Label of the rejected replacement.
        label: String,
    },

    /// `start` was called on a pool that has not stopped.
    #[error("pool is already running")]
    AlreadyRunning,

    /// `start` was called on a pool that has already run to a stop.
    #[error("pool has already stopped and cannot be started again")]
    AlreadyStopped,

    /// The supplied configuration document is invalid.
    #[error(transparent)]
    Config(#[from] procmux_config::ConfigError),
}

/// Errors surfaced by pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool was used against its contract.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A process in an occupied slot failed.
    #[error("process in slot {slot} failed: {source}")]
    Process {
        /// Slot holding the process.
        slot: usize,
        /// Underlying process failure.
        #[source]
        source: ProcessError,
    },
}

impl PoolError {
    /// Returns the router failure behind this error, if any.
    #[must_use]
    pub const fn router_error(&self) -> Option<&RouterError> {
        match self {
            Self::Process {
                source: ProcessError::Delivery(error),
                ..
            } => Some(error),
            _ => None,
        }
    }
}
