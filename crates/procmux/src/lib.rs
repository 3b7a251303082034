//! Supervision of child processes that talk back over their standard streams.
//!
//! A child writes one encoded [`procmux_protocol::Message`] per line on
//! stdout and stderr. The controller side is split into three layers:
//!
//! - [`process`] spawns a child with piped streams, forwards each chunk of
//!   output to a [`ChunkSink`], and stops it with a signal followed by a kill
//!   once the grace period expires.
//! - [`router`] reassembles lines, decodes them with a pluggable codec and
//!   dispatches echoes, application payloads and exceptions to registered
//!   handlers. Anything arriving on stderr is treated as a failure.
//! - [`pool`] keeps a bounded number of handles running, pulling new work
//!   from a [`WorkSource`] and letting a finish hook restart or replace
//!   terminated work.
//!
//! Errors are typed per layer (see [`error`]), and all diagnostics are
//! emitted through `tracing`. [`telemetry::initialise`] installs a stderr
//! subscriber for controllers that do not bring their own.
//!
//! ```rust,no_run
//! use procmux::{ChildCommand, ChildProcess, MessageRouter, ProcessHandle};
//!
//! # fn main() -> Result<(), procmux::ProcessError> {
//! let router = MessageRouter::new()
//!     .on_message(|value| tracing::info!(%value, "result"))
//!     .on_exception(|failure| tracing::error!(%failure, "child failed"));
//!
//! let mut child = ChildProcess::new(ChildCommand::new("worker").arg("--fast"))
//!     .with_label("worker")
//!     .with_sink(router);
//! child.start()?;
//! while !child.is_terminated() {
//!     child.pump()?;
//!     std::thread::sleep(std::time::Duration::from_millis(50));
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod pool;
pub mod process;
pub mod router;
pub mod telemetry;

pub use error::{ConfigurationError, PoolError, ProcessError, RouterError};
pub use pool::{PoolState, ProcessPool, SlotState, WorkSource};
pub use process::{ChildCommand, ChildProcess, ChunkSink, DEFAULT_LABEL, ProcessHandle, StreamKind};
pub use router::{MAX_LINE_LENGTH, MessageRouter, STDERR_SOURCE_TYPE};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
