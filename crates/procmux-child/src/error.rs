//! Errors raised while emitting messages.

use std::io;

use procmux_protocol::CodecError;
use thiserror::Error;

/// A message could not be written to the controller.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The codec rejected the message.
    #[error("failed to encode message: {source}")]
    Encode {
        /// Underlying codec failure.
        #[from]
        source: CodecError,
    },

    /// The message could not be rendered as readable JSON.
    #[error("failed to render message: {source}")]
    Render {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing to the stream failed.
    #[error("failed to write message to {stream}: {source}")]
    Write {
        /// Name of the stream being written.
        stream: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
