//! Base64 transport codec.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::Codec;
use crate::error::CodecError;
use crate::message::Message;

/// Encodes the JSON form of a message as standard, padded base64.
///
/// The output alphabet is `[A-Za-z0-9+/=]`, so lines can never contain
/// control bytes regardless of the payload.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Base64Codec;

impl Codec for Base64Codec {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn encode(&self, message: &Message) -> Result<String, CodecError> {
        let bytes = message.to_wire_bytes()?;
        Ok(STANDARD.encode(bytes))
    }

    fn decode(&self, line: &str) -> Result<Message, CodecError> {
        let bytes = STANDARD
            .decode(line.trim())
            .map_err(|err| CodecError::InvalidEncoding {
                codec: self.name(),
                message: err.to_string(),
            })?;
        Message::from_wire_bytes(&bytes)
    }
}
