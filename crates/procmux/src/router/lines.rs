//! Reassembly of newline-terminated lines from arbitrary chunks.

/// Longest line, in bytes, a router accepts by default.
pub const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

/// Holds the unterminated tail of one stream between chunks.
///
/// At most `limit + 1` bytes of any line are kept. A line that reaches that
/// length is still yielded once its newline arrives, so the caller can tell it
/// was too long without the buffer growing with the child's output.
#[derive(Debug)]
pub(super) struct LineBuffer {
    pending: Vec<u8>,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(MAX_LINE_LENGTH)
    }
}

impl LineBuffer {
    pub(super) const fn new(limit: usize) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    /// Appends `chunk` and returns every line it completes, without the
    /// terminating newline.
    pub(super) fn push(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(position) = rest.iter().position(|byte| *byte == b'\n') {
            let (line, tail) = rest.split_at(position);
            self.keep(line);
            lines.push(std::mem::take(&mut self.pending));
            rest = tail.get(1..).unwrap_or_default();
        }
        self.keep(rest);
        lines
    }

    /// Takes whatever is left once the stream has ended.
    pub(super) fn flush(&mut self) -> Option<Vec<u8>> {
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }

    fn keep(&mut self, bytes: &[u8]) {
        let room = self
            .limit
            .saturating_add(1)
            .saturating_sub(self.pending.len());
        self.pending.extend_from_slice(bytes.get(..room).unwrap_or(bytes));
    }
}
