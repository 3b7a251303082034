//! Errors raised while encoding or decoding protocol lines.

use thiserror::Error;

/// Errors arising from codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The message could not be serialised.
    #[error("failed to serialise message: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },

    /// The line is not valid under the codec's text transform.
    #[error("line is not valid {codec}: {message}")]
    InvalidEncoding {
        /// Name of the codec that rejected the line.
        codec: &'static str,
        /// Description of the transform failure.
        message: String,
    },

    /// The decoded bytes are not a well-formed message.
    #[error("malformed message: {message}")]
    Malformed {
        /// Description of the structural problem.
        message: String,
        /// Optional underlying JSON error.
        #[source]
        source: Option<serde_json::Error>,
    },

    /// The message is well formed but carries an unrecognised type tag.
    #[error("unknown message type '{tag}'")]
    UnknownType {
        /// Tag found on the wire.
        tag: String,
    },
}

impl CodecError {
    /// Returns `true` when the failure is an unrecognised message type.
    #[must_use]
    pub const fn is_unknown_type(&self) -> bool {
        matches!(self, Self::UnknownType { .. })
    }
}
