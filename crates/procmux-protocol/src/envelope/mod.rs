//! Transportable snapshots of failures.
//!
//! An [`ExceptionEnvelope`] is built once, at the moment a failure is about
//! to cross the process boundary, and is immutable afterwards. It copies the
//! reportable state of the failure (type name, description, location, code
//! and call stack) and drops everything else. Stack frame arguments are
//! reduced to [`ArgSummary`] tags, trading debugging fidelity for the
//! guarantee that the envelope always serialises.
//!
//! On the controller side the decoded envelope is itself the error value: it
//! implements [`std::error::Error`] and exposes the captured fields through
//! accessors.

mod backtrace;
mod frame;
mod summary;

use std::any::type_name;
use std::error::Error;
use std::fmt::{self, Write as _};
use std::panic::{Location, PanicHookInfo};

use serde::{Deserialize, Serialize};

pub use self::frame::StackFrame;
pub use self::summary::{ArgSummary, Summarize};

/// Exit code conventionally used by Rust processes that panicked.
pub const PANIC_CODE: i64 = 101;

/// Source type recorded for envelopes built from panics.
pub const PANIC_SOURCE_TYPE: &str = "panic";

/// Serialisable snapshot of a failure.
///
/// # Example
///
/// ```
/// use procmux_protocol::ExceptionEnvelope;
///
/// let error = std::io::Error::other("disk full");
/// let envelope = ExceptionEnvelope::capture(&error);
///
/// assert!(envelope.source_type().ends_with("Error"));
/// assert!(envelope.description().starts_with("(std::io::"));
/// assert!(envelope.description().contains("disk full"));
/// assert!(envelope.file().ends_with(".rs"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEnvelope {
    source_type: String,
    description: String,
    file: String,
    line: u32,
    code: i64,
    #[serde(default)]
    frames: Vec<StackFrame>,
}

impl ExceptionEnvelope {
    /// Creates an envelope for a failure of the given type.
    ///
    /// The description is prefixed with the source type, as in
    /// `(ParseError) unexpected token`. Location defaults to the caller.
    #[must_use]
    #[track_caller]
    pub fn new(source_type: impl Into<String>, message: impl fmt::Display) -> Self {
        let kind: String = source_type.into();
        let location = Location::caller();
        Self {
            description: format!("({kind}) {message}"),
            source_type: kind,
            file: location.file().to_owned(),
            line: location.line(),
            code: 0,
            frames: Vec::new(),
        }
    }

    /// Snapshots a live error.
    ///
    /// The description includes the error's `source()` chain. Frames are
    /// taken from [`std::backtrace::Backtrace::capture`], so they are only
    /// present when backtraces are enabled for the process.
    #[must_use]
    #[track_caller]
    pub fn capture<E: Error + ?Sized>(error: &E) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            // Writing to a String cannot fail.
            write!(message, "\ncaused by: {cause}").ok();
            source = cause.source();
        }
        Self::new(type_name::<E>(), message).with_frames(backtrace::capture_frames())
    }

    /// Snapshots a panic from inside a panic hook.
    #[must_use]
    pub fn from_panic(info: &PanicHookInfo<'_>) -> Self {
        let payload = info.payload();
        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("Box<dyn Any>");

        let envelope = Self::new(PANIC_SOURCE_TYPE, message)
            .with_code(PANIC_CODE)
            .with_frames(backtrace::capture_frames());

        match info.location() {
            Some(location) => envelope.with_location(location.file(), location.line()),
            None => envelope.with_location("<unknown>", 0),
        }
    }

    /// Overrides the originating file and line.
    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Sets the numeric error code.
    #[must_use]
    pub const fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    /// Replaces the call-stack frames.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<StackFrame>) -> Self {
        self.frames = frames;
        self
    }

    /// Returns a copy whose frame arguments have been summarised again.
    #[must_use]
    pub fn resummarized(&self) -> Self {
        Self {
            frames: self.frames.iter().map(StackFrame::resummarized).collect(),
            ..self.clone()
        }
    }

    /// Returns the type name of the original failure.
    #[must_use]
    pub const fn source_type(&self) -> &str {
        self.source_type.as_str()
    }

    /// Returns the human-readable description.
    #[must_use]
    pub const fn description(&self) -> &str {
        self.description.as_str()
    }

    /// Returns the file where the failure originated.
    #[must_use]
    pub const fn file(&self) -> &str {
        self.file.as_str()
    }

    /// Returns the line where the failure originated.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Returns the numeric error code.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.code
    }

    /// Returns the captured call-stack frames, innermost first.
    #[must_use]
    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }
}

impl fmt::Display for ExceptionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.description, self.file, self.line)
    }
}

impl Error for ExceptionEnvelope {}
