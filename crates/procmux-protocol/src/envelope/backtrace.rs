//! Conversion of captured backtraces into [`StackFrame`] lists.
//!
//! The standard library does not expose backtrace frames on stable Rust, so
//! frames are recovered from the rendered form:
//!
//! ```text
//!    3: myapp::image::Image::resize
//!              at ./src/image.rs:42:9
//! ```

use std::backtrace::{Backtrace, BacktraceStatus};

use super::frame::StackFrame;

/// Captures the current backtrace and converts it to frames.
///
/// Returns an empty list when backtraces are disabled through
/// `RUST_BACKTRACE`/`RUST_LIB_BACKTRACE`.
pub(crate) fn capture_frames() -> Vec<StackFrame> {
    let backtrace = Backtrace::capture();
    match backtrace.status() {
        BacktraceStatus::Captured => parse_frames(&backtrace.to_string()),
        _ => Vec::new(),
    }
}

/// Parses rendered backtrace text into frames.
pub(crate) fn parse_frames(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();

    for raw in text.lines() {
        let line = raw.trim();
        if let Some(location) = line.strip_prefix("at ") {
            if let Some(frame) = frames.pop() {
                frames.push(attach_location(frame, location));
            }
            continue;
        }

        if let Some(symbol) = frame_symbol(line) {
            frames.push(frame_from_symbol(symbol));
        }
    }

    frames
}

/// Extracts the symbol from a `N: symbol` header line.
fn frame_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.split_once(": ")?;
    if index.is_empty() || !index.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let trimmed = symbol.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn frame_from_symbol(raw: &str) -> StackFrame {
    let symbol = strip_hash(raw);

    // Trait impl paths such as `<T as Trait>::method` keep their full text.
    if symbol.starts_with('<') {
        return StackFrame::new(symbol);
    }

    let mut segments = symbol.rsplit("::");
    let function = segments.next().unwrap_or(symbol);
    let frame = StackFrame::new(function);
    match segments.next() {
        Some(owner) if owner.starts_with(|c: char| c.is_ascii_uppercase()) => {
            frame.with_class(owner)
        }
        _ => frame,
    }
}

/// Removes a trailing `::h0123456789abcdef` legacy mangling hash.
fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::") {
        Some((head, tail))
            if tail.len() == 17
                && tail.starts_with('h')
                && tail.chars().skip(1).all(|c| c.is_ascii_hexdigit()) =>
        {
            head
        }
        _ => symbol,
    }
}

/// Parses `file:line:column` and attaches it to the frame.
fn attach_location(frame: StackFrame, location: &str) -> StackFrame {
    let mut parts = location.rsplitn(3, ':');
    let _column = parts.next();
    let line = parts.next().and_then(|value| value.parse::<u32>().ok());
    let file = parts.next();
    match (file, line) {
        (Some(path), Some(number)) => frame.at(path, number),
        _ => frame,
    }
}
