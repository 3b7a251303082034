//! Supervised child processes.
//!
//! A [`ProcessHandle`] is the unit of work the pool schedules. The pool only
//! needs liveness checks, a non-blocking stop, and a way to start the process
//! once; everything else is up to the implementation. [`ChildProcess`] is the
//! OS-backed implementation: it spawns a command with piped standard streams,
//! reads both pipes on background threads, and hands the bytes to a
//! [`ChunkSink`] on the controller thread whenever it is pumped.

mod child;
mod command;
mod reader;

use std::time::Duration;

use nix::sys::signal::Signal;
use strum::Display;

pub use child::{ChildProcess, DEFAULT_LABEL};
pub use command::ChildCommand;

use crate::error::{ProcessError, RouterError};

/// Log target for process supervision.
pub(crate) const PROCESS_TARGET: &str = "procmux::process";

/// Standard stream a chunk of child output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum StreamKind {
    /// The child's standard output.
    Stdout,
    /// The child's standard error.
    Stderr,
}

/// Consumer of raw child output.
///
/// Chunks arrive in the order the child wrote them on each stream. No
/// ordering is promised between the two streams.
pub trait ChunkSink: Send {
    /// Handles one chunk of bytes read from `stream`.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] when the chunk cannot be interpreted. The
    /// error is surfaced to whoever pumped the process.
    fn on_chunk(&mut self, stream: StreamKind, chunk: &[u8]) -> Result<(), RouterError>;

    /// Called once when `stream` reaches end of file.
    ///
    /// # Errors
    ///
    /// Returns a [`RouterError`] when buffered output cannot be interpreted.
    fn on_close(&mut self, stream: StreamKind) -> Result<(), RouterError>;

    /// Updates the label used when describing the emitting process.
    fn set_label(&mut self, label: &str);
}

/// A process the pool can schedule.
///
/// A handle moves through three observable phases: not yet started (neither
/// running nor terminated), running, and terminated. Termination is final.
pub trait ProcessHandle: Sized {
    /// Launches the process.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] if the process cannot be launched.
    fn start(&mut self) -> Result<(), ProcessError>;

    /// Delivers any output received since the last call.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] if output delivery fails.
    fn pump(&mut self) -> Result<(), ProcessError> {
        Ok(())
    }

    /// Requests a stop without blocking.
    ///
    /// `signal` defaults to `SIGTERM`. A process still alive once `timeout`
    /// has elapsed is killed the next time it is polled. Stopping a process
    /// that never started or has already terminated does nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] if the signal cannot be delivered.
    fn stop(&mut self, timeout: Duration, signal: Option<Signal>) -> Result<(), ProcessError>;

    /// Returns `true` while the process is alive.
    fn is_running(&mut self) -> bool;

    /// Returns `true` once the process has exited and its output is consumed.
    fn is_terminated(&mut self) -> bool;

    /// Returns the human-readable label.
    fn label(&self) -> &str;

    /// Replaces the label.
    fn set_label(&mut self, label: String);

    /// Produces and starts a fresh handle for the same work.
    ///
    /// # Errors
    ///
    /// Returns a [`ProcessError`] if this process is still running or the
    /// replacement cannot be started.
    fn restart(&mut self) -> Result<Self, ProcessError>;
}
