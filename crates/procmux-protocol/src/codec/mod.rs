//! Line codecs for protocol messages.
//!
//! Framing downstream splits on newlines, so every codec must guarantee that
//! [`Codec::encode`] never produces a newline, even when the payload contains
//! one. Routers and pools only see the [`Codec`] trait, so an alternative
//! implementation can be swapped in without touching them.

mod base64_codec;
mod json_codec;

pub use self::base64_codec::Base64Codec;
pub use self::json_codec::JsonCodec;

use crate::error::CodecError;
use crate::message::Message;

/// Converts a [`Message`] to a single line of text and back.
///
/// Implementations must uphold two laws:
///
/// - `decode(encode(m)) == m` for every message `m`;
/// - `encode(m)` contains no `\n` or `\r` byte.
///
/// # Example
///
/// ```
/// use procmux_protocol::{Codec, JsonCodec, Message};
///
/// let codec = JsonCodec;
/// let line = codec.encode(&Message::echo("a\nb")).expect("encode");
/// assert_eq!(line, r#"{"type":"echo","payload":"a\nb"}"#);
/// ```
pub trait Codec: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Encodes a message as one line without a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the message cannot be serialised.
    fn encode(&self, message: &Message) -> Result<String, CodecError>;

    /// Decodes one line (surrounding whitespace is ignored).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidEncoding`] when the text transform is
    /// invalid, [`CodecError::Malformed`] when the decoded structure is not a
    /// message, and [`CodecError::UnknownType`] when the tag is not recognised.
    fn decode(&self, line: &str) -> Result<Message, CodecError>;
}

impl<C: Codec + ?Sized> Codec for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn encode(&self, message: &Message) -> Result<String, CodecError> {
        (**self).encode(message)
    }

    fn decode(&self, line: &str) -> Result<Message, CodecError> {
        (**self).decode(line)
    }
}

#[cfg(test)]
mod tests;
