//! Plain JSON line codec.

use super::Codec;
use crate::error::CodecError;
use crate::message::Message;

/// Writes messages as compact single-line JSON.
///
/// `serde_json` escapes every control character inside strings, so embedded
/// newlines in payloads become `\n` escapes and the line stays intact.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, message: &Message) -> Result<String, CodecError> {
        serde_json::to_string(message).map_err(|source| CodecError::Encode { source })
    }

    fn decode(&self, line: &str) -> Result<Message, CodecError> {
        Message::from_wire_bytes(line.trim().as_bytes())
    }
}
