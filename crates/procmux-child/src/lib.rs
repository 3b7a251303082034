//! Child-side helpers for processes supervised by `procmux`.
//!
//! A supervised child reports progress and results by writing protocol
//! messages to its standard streams. [`ChildContext`] renders them according
//! to a [`CaptureConfig`]: encoded lines for a controller, or pretty JSON for
//! a person running the child directly. Configuration is always passed in
//! explicitly; nothing here reads process-wide flags.
//!
//! Unrecoverable failures go to stderr as exception messages, either through
//! [`ChildContext::exit_with_exception`] or, for panics, through the hook
//! installed by [`install_panic_hook`].

mod config;
mod context;
mod echo;
mod error;
mod panic_hook;

pub use config::{CaptureConfig, EmitMode};
pub use context::{ChildContext, FAILURE_EXIT_CODE};
pub use echo::EchoWriter;
pub use error::EmitError;
pub use panic_hook::install_panic_hook;
