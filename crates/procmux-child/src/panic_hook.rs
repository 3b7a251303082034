//! Reporting panics to the controller.

use std::io;
use std::panic;

use procmux_protocol::{ExceptionEnvelope, Message};

use crate::config::CaptureConfig;
use crate::context::emit;

/// Replaces the panic hook so that a panic is written to stderr as an
/// exception message before the thread unwinds.
///
/// The default hook is not chained; in [`crate::EmitMode::Plain`] the
/// rendered envelope already carries the message and location.
pub fn install_panic_hook(config: CaptureConfig) {
    panic::set_hook(Box::new(move |info| {
        let message = Message::exception(ExceptionEnvelope::from_panic(info));
        emit(&config, &mut io::stderr().lock(), "stderr", &message).ok();
    }));
}
