//! An `io::Write` adapter that forwards output as echo messages.

use std::io::{self, Write};

use crate::context::ChildContext;

/// Buffers bytes and emits one echo per completed line.
///
/// A trailing partial line is emitted on [`Write::flush`] or when the writer
/// is dropped. Invalid UTF-8 is replaced rather than rejected.
///
/// ```rust
/// use std::io::Write;
/// use procmux_child::{CaptureConfig, ChildContext};
/// use procmux_protocol::JsonCodec;
///
/// let mut context =
///     ChildContext::with_writers(CaptureConfig::encoded(JsonCodec), Vec::new(), Vec::new());
/// write!(context.echo_writer(), "one\ntwo").expect("write");
///
/// let stdout = String::from_utf8(context.stdout().clone()).expect("utf-8");
/// assert_eq!(stdout.lines().count(), 2);
/// ```
pub struct EchoWriter<'a, O: Write, E: Write> {
    context: &'a mut ChildContext<O, E>,
    pending: Vec<u8>,
}

impl<'a, O: Write, E: Write> EchoWriter<'a, O, E> {
    pub(crate) const fn new(context: &'a mut ChildContext<O, E>) -> Self {
        Self {
            context,
            pending: Vec::new(),
        }
    }

    fn emit_line(&mut self, line: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(line);
        self.context
            .echo(text.trim_end_matches(['\n', '\r']))
            .map_err(io::Error::other)
    }
}

impl<O: Write, E: Write> Write for EchoWriter<'_, O, E> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while let Some(end) = self.pending.iter().position(|byte| *byte == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.emit_line(&line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.pending);
        self.emit_line(&line)
    }
}

impl<O: Write, E: Write> Drop for EchoWriter<'_, O, E> {
    fn drop(&mut self) {
        self.flush().ok();
    }
}
