//! Writing protocol messages to the controller.
//!
//! Echoes and application values go to stdout. Exceptions go to stderr, the
//! stream a controller treats as the failure channel.

use std::error::Error;
use std::io::{self, Stderr, Stdout, Write};
use std::process;

use procmux_protocol::{ExceptionEnvelope, Message};
use serde::Serialize;

use crate::config::CaptureConfig;
use crate::echo::EchoWriter;
use crate::error::EmitError;

/// Exit status used after reporting an unrecoverable failure.
pub const FAILURE_EXIT_CODE: i32 = 1;

/// Writes one rendered message followed by a newline and flushes.
pub(crate) fn emit(
    config: &CaptureConfig,
    out: &mut impl Write,
    stream: &'static str,
    message: &Message,
) -> Result<(), EmitError> {
    let text = config.render(message)?;
    writeln!(out, "{text}")
        .and_then(|()| out.flush())
        .map_err(|source| EmitError::Write { stream, source })
}

/// The child's side of the protocol.
///
/// Generic over the two writers so tests can capture output; production code
/// uses [`ChildContext::new`], which writes to the real stdout and stderr.
///
/// ```rust,no_run
/// use procmux_child::{CaptureConfig, ChildContext};
/// use procmux_protocol::JsonCodec;
///
/// # fn main() -> Result<(), procmux_child::EmitError> {
/// let mut context = ChildContext::new(CaptureConfig::encoded(JsonCodec));
/// context.echo("starting")?;
/// context.send(&[1, 2, 3])?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ChildContext<O = Stdout, E = Stderr> {
    config: CaptureConfig,
    stdout: O,
    stderr: E,
}

impl ChildContext {
    /// Creates a context writing to the process's standard streams.
    #[must_use]
    pub fn new(config: CaptureConfig) -> Self {
        Self::with_writers(config, io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> ChildContext<O, E> {
    /// Creates a context writing to the given streams.
    #[must_use]
    pub const fn with_writers(config: CaptureConfig, stdout: O, stderr: E) -> Self {
        Self {
            config,
            stdout,
            stderr,
        }
    }

    /// Returns the capture settings.
    #[must_use]
    pub const fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Sends an application value on stdout.
    ///
    /// # Errors
    ///
    /// Returns an [`EmitError`] when the value cannot be serialised or
    /// written.
    pub fn send<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), EmitError> {
        let message = Message::application(value)?;
        emit(&self.config, &mut self.stdout, "stdout", &message)
    }

    /// Sends diagnostic text on stdout.
    ///
    /// # Errors
    ///
    /// Returns an [`EmitError`] when the message cannot be written.
    pub fn echo(&mut self, text: impl Into<String>) -> Result<(), EmitError> {
        emit(&self.config, &mut self.stdout, "stdout", &Message::echo(text))
    }

    /// Reports a failure on stderr. The child keeps running.
    ///
    /// # Errors
    ///
    /// Returns an [`EmitError`] when the message cannot be written.
    pub fn send_exception(&mut self, envelope: ExceptionEnvelope) -> Result<(), EmitError> {
        emit(
            &self.config,
            &mut self.stderr,
            "stderr",
            &Message::exception(envelope),
        )
    }

    /// Captures `error` with its cause chain and writes it to stderr as an
    /// exception message attributed to the caller's location.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`ChildContext::send_exception`].
    #[track_caller]
    pub fn send_error<F: Error + ?Sized>(&mut self, error: &F) -> Result<(), EmitError> {
        self.send_exception(ExceptionEnvelope::capture(error))
    }

    /// Reports `error` on stderr and exits with [`FAILURE_EXIT_CODE`].
    ///
    /// The failure is reported even if earlier writes failed; a write error
    /// here cannot be surfaced and is dropped.
    #[track_caller]
    pub fn exit_with_exception<F: Error + ?Sized>(&mut self, error: &F) -> ! {
        self.send_error(error).ok();
        process::exit(FAILURE_EXIT_CODE)
    }

    /// Returns a writer that turns every completed line into an echo.
    #[must_use]
    pub const fn echo_writer(&mut self) -> EchoWriter<'_, O, E> {
        EchoWriter::new(self)
    }

    /// Returns the stdout writer.
    #[must_use]
    pub const fn stdout(&self) -> &O {
        &self.stdout
    }

    /// Returns the stderr writer.
    #[must_use]
    pub const fn stderr(&self) -> &E {
        &self.stderr
    }
}
