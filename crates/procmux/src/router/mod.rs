//! Decoding and dispatch of child output.
//!
//! A [`MessageRouter`] belongs to exactly one child process. It reassembles
//! lines from raw stream chunks, decodes each non-empty line with its codec,
//! and hands the result to the handler matching the stream and message type:
//!
//! | Stream | Message | Handler |
//! |---|---|---|
//! | stdout | echo | [`MessageRouter::on_echo`] (default: print `\| label \| text`) |
//! | stdout | application | [`MessageRouter::on_message`] (default: ignore) |
//! | stdout | exception | [`MessageRouter::on_exception`] |
//! | stderr | any | [`MessageRouter::on_exception`] |
//!
//! Without an exception handler the envelope is returned to the caller as
//! [`RouterError::ChildFailure`]. Lines longer than [`MAX_LINE_LENGTH`] bytes
//! (or the limit set with [`MessageRouter::with_max_line_length`]) are
//! rejected as [`RouterError::Decoding`] without being buffered in full.

mod lines;

use std::io::{self, Write};

use procmux_protocol::{Base64Codec, Codec, CodecError, ExceptionEnvelope, Message};
use serde_json::Value;
use tracing::{debug, trace, warn};

pub use self::lines::MAX_LINE_LENGTH;

use self::lines::LineBuffer;
use crate::error::RouterError;
use crate::process::{ChunkSink, DEFAULT_LABEL, StreamKind};

/// Log target for router operations.
pub(crate) const ROUTER_TARGET: &str = "procmux::router";

/// Source type given to envelopes synthesised from non-exception stderr
/// messages.
pub const STDERR_SOURCE_TYPE: &str = "procmux::StderrMessage";

/// Receives echo text from the child.
pub type EchoHandler = Box<dyn FnMut(&str) + Send>;
/// Receives application payloads from the child.
pub type MessageHandler = Box<dyn FnMut(Value) + Send>;
/// Receives failures reported by the child.
pub type ExceptionHandler = Box<dyn FnMut(ExceptionEnvelope) + Send>;
/// Observes every chunk before it is decoded.
pub type RawObserver = Box<dyn FnMut(StreamKind, &[u8]) + Send>;

/// Routes one child's output to its handlers.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, Mutex};
///
/// use procmux::{MessageRouter, StreamKind};
/// use procmux_protocol::{Codec, JsonCodec, Message};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let received = Arc::new(Mutex::new(Vec::new()));
/// let sink = Arc::clone(&received);
/// let mut router = MessageRouter::with_codec(JsonCodec)
///     .on_message(move |value| {
///         if let Ok(mut values) = sink.lock() {
///             values.push(value);
///         }
///     });
///
/// let line = JsonCodec.encode(&Message::application(&[1, 2, 3])?)?;
/// router.route_chunk(StreamKind::Stdout, format!("{line}\n").as_bytes())?;
///
/// assert_eq!(received.lock().map(|values| values.len()).unwrap_or(0), 1);
/// # Ok(())
/// # }
/// ```
pub struct MessageRouter<C = Base64Codec> {
    codec: C,
    label: String,
    echo_handler: Option<EchoHandler>,
    message_handler: Option<MessageHandler>,
    exception_handler: Option<ExceptionHandler>,
    raw_observer: Option<RawObserver>,
    max_line_length: usize,
    stdout: LineBuffer,
    stderr: LineBuffer,
}

impl MessageRouter<Base64Codec> {
    /// Creates a router using the default base64 codec.
    #[must_use]
    pub fn new() -> Self {
        Self::with_codec(Base64Codec)
    }
}

impl Default for MessageRouter<Base64Codec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Codec> MessageRouter<C> {
    /// Creates a router decoding lines with `codec`.
    #[must_use]
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            label: DEFAULT_LABEL.to_owned(),
            echo_handler: None,
            message_handler: None,
            exception_handler: None,
            raw_observer: None,
            max_line_length: MAX_LINE_LENGTH,
            stdout: LineBuffer::default(),
            stderr: LineBuffer::default(),
        }
    }

    /// Sets the label used in default output and diagnostics.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.set_label(&label.into());
        self
    }

    /// Sets the longest line, in bytes, the router will decode.
    ///
    /// Bytes past the limit are discarded as they arrive; the line is
    /// reported as a decoding failure once its newline is seen.
    #[must_use]
    pub fn with_max_line_length(mut self, limit: usize) -> Self {
        self.max_line_length = limit;
        self.stdout = LineBuffer::new(limit);
        self.stderr = LineBuffer::new(limit);
        self
    }

    /// Registers the handler for echo messages on stdout.
    #[must_use]
    pub fn on_echo(mut self, handler: impl FnMut(&str) + Send + 'static) -> Self {
        self.echo_handler = Some(Box::new(handler));
        self
    }

    /// Registers the handler for application messages on stdout.
    #[must_use]
    pub fn on_message(mut self, handler: impl FnMut(Value) + Send + 'static) -> Self {
        self.message_handler = Some(Box::new(handler));
        self
    }

    /// Registers the handler for failures reported by the child.
    #[must_use]
    pub fn on_exception(mut self, handler: impl FnMut(ExceptionEnvelope) + Send + 'static) -> Self {
        self.exception_handler = Some(Box::new(handler));
        self
    }

    /// Registers an observer that sees every chunk before decoding.
    #[must_use]
    pub fn on_raw(mut self, observer: impl FnMut(StreamKind, &[u8]) + Send + 'static) -> Self {
        self.raw_observer = Some(Box::new(observer));
        self
    }

    /// Returns the label of the process this router serves.
    #[must_use]
    pub const fn label(&self) -> &str {
        self.label.as_str()
    }

    /// Returns the codec.
    #[must_use]
    pub const fn codec(&self) -> &C {
        &self.codec
    }

    /// Decodes and dispatches every line `chunk` completes on `stream`.
    ///
    /// The raw observer runs first, regardless of what follows. Dispatch stops
    /// at the first failing line; earlier lines of the chunk have already been
    /// handled.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Decoding`] for a line the codec rejects,
    /// [`RouterError::Protocol`] for an unknown message type and
    /// [`RouterError::ChildFailure`] for a child failure with no exception
    /// handler registered.
    pub fn route_chunk(&mut self, stream: StreamKind, chunk: &[u8]) -> Result<(), RouterError> {
        if let Some(observer) = self.raw_observer.as_mut() {
            observer(stream, chunk);
        }
        trace!(
            target: ROUTER_TARGET,
            label = %self.label,
            %stream,
            bytes = chunk.len(),
            "routing chunk"
        );
        let lines = self.buffer_mut(stream).push(chunk);
        self.dispatch_lines(stream, &lines)
    }

    /// Dispatches a trailing unterminated line once `stream` has ended.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`MessageRouter::route_chunk`].
    pub fn close_stream(&mut self, stream: StreamKind) -> Result<(), RouterError> {
        let Some(line) = self.buffer_mut(stream).flush() else {
            return Ok(());
        };
        self.dispatch_lines(stream, &[line])
    }

    const fn buffer_mut(&mut self, stream: StreamKind) -> &mut LineBuffer {
        match stream {
            StreamKind::Stdout => &mut self.stdout,
            StreamKind::Stderr => &mut self.stderr,
        }
    }

    fn dispatch_lines(&mut self, stream: StreamKind, lines: &[Vec<u8>]) -> Result<(), RouterError> {
        for raw in lines {
            if let Some(message) = self.decode_line(stream, raw, lines)? {
                self.dispatch(stream, message)?;
            }
        }
        Ok(())
    }

    fn decode_line(
        &self,
        stream: StreamKind,
        raw: &[u8],
        chunk: &[Vec<u8>],
    ) -> Result<Option<Message>, RouterError> {
        if raw.len() > self.max_line_length {
            let source = CodecError::Malformed {
                message: format!("line exceeds {} bytes", self.max_line_length),
                source: None,
            };
            return Err(self.decoding_error(&String::from_utf8_lossy(raw), chunk, source));
        }

        let text = match std::str::from_utf8(raw) {
            Ok(text) => text,
            Err(error) => {
                let source = CodecError::InvalidEncoding {
                    codec: "utf-8",
                    message: error.to_string(),
                };
                return Err(self.decoding_error(&String::from_utf8_lossy(raw), chunk, source));
            }
        };

        let line = text.trim();
        if line.is_empty() {
            return Ok(None);
        }

        match self.codec.decode(line) {
            Ok(message) => Ok(Some(message)),
            Err(CodecError::UnknownType { tag }) => {
                warn!(
                    target: ROUTER_TARGET,
                    label = %self.label,
                    %stream,
                    tag = %tag,
                    "unknown message type"
                );
                Err(RouterError::Protocol {
                    label: self.label.clone(),
                    stream,
                    tag,
                })
            }
            Err(source) => Err(self.decoding_error(line, chunk, source)),
        }
    }

    fn decoding_error(&self, line: &str, chunk: &[Vec<u8>], source: CodecError) -> RouterError {
        warn!(
            target: ROUTER_TARGET,
            label = %self.label,
            codec = self.codec.name(),
            error = %source,
            "failed to decode line"
        );
        RouterError::Decoding {
            label: self.label.clone(),
            codec: self.codec.name(),
            line: line.to_owned(),
            context: chunk
                .iter()
                .map(|line| String::from_utf8_lossy(line).into_owned())
                .collect(),
            source,
        }
    }

    fn dispatch(&mut self, stream: StreamKind, message: Message) -> Result<(), RouterError> {
        debug!(
            target: ROUTER_TARGET,
            label = %self.label,
            %stream,
            kind = %message.kind(),
            "dispatching message"
        );
        match (stream, message) {
            (StreamKind::Stdout, Message::Echo(text)) => {
                self.emit_echo(&text);
                Ok(())
            }
            (StreamKind::Stdout, Message::Application(value)) => {
                if let Some(handler) = self.message_handler.as_mut() {
                    handler(value);
                }
                Ok(())
            }
            (_, Message::Exception(envelope)) => self.emit_exception(envelope),
            (StreamKind::Stderr, Message::Echo(text)) => {
                self.emit_exception(stderr_envelope(&self.label, &text))
            }
            (StreamKind::Stderr, Message::Application(value)) => {
                self.emit_exception(stderr_envelope(&self.label, &value))
            }
        }
    }

    fn emit_echo(&mut self, text: &str) {
        if let Some(handler) = self.echo_handler.as_mut() {
            handler(text);
            return;
        }
        if let Err(error) = write_echo(&mut io::stdout().lock(), &self.label, text) {
            warn!(
                target: ROUTER_TARGET,
                label = %self.label,
                error = %error,
                "failed to write echo output"
            );
        }
    }

    fn emit_exception(&mut self, envelope: ExceptionEnvelope) -> Result<(), RouterError> {
        let Some(handler) = self.exception_handler.as_mut() else {
            return Err(RouterError::ChildFailure {
                label: self.label.clone(),
                envelope: Box::new(envelope),
            });
        };
        handler(envelope);
        Ok(())
    }
}

impl<C: Codec> ChunkSink for MessageRouter<C> {
    fn on_chunk(&mut self, stream: StreamKind, chunk: &[u8]) -> Result<(), RouterError> {
        self.route_chunk(stream, chunk)
    }

    fn on_close(&mut self, stream: StreamKind) -> Result<(), RouterError> {
        self.close_stream(stream)
    }

    fn set_label(&mut self, label: &str) {
        label.clone_into(&mut self.label);
    }
}

fn stderr_envelope(label: &str, message: &dyn std::fmt::Display) -> ExceptionEnvelope {
    ExceptionEnvelope::new(STDERR_SOURCE_TYPE, message).with_location(format!("<{label} stderr>"), 0)
}

/// Writes echo text prefixed with the process label.
fn write_echo(out: &mut impl Write, label: &str, text: &str) -> io::Result<()> {
    let shown = if label.is_empty() { DEFAULT_LABEL } else { label };
    let newline = if text.ends_with('\n') { "" } else { "\n" };
    write!(out, "| {shown} | {text}{newline}")?;
    out.flush()
}
