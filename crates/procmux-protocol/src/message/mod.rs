//! Message types exchanged between a child and its controller.
//!
//! Before a codec applies its text transform, every message has the JSON
//! shape `{"type": "<tag>", "payload": <value>}`. The tag is checked against
//! [`MessageKind`] before the payload is interpreted, so a structurally valid
//! message carrying an unknown tag is reported as
//! [`CodecError::UnknownType`] rather than as a malformed line.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

use crate::envelope::ExceptionEnvelope;
use crate::error::CodecError;

/// Discriminator carried by every message on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MessageKind {
    /// Diagnostic text the child printed.
    Echo,
    /// Application-level data.
    Application,
    /// A failure snapshot.
    Exception,
}

/// A single typed message written by a child process.
///
/// The variant fixes the payload shape, so handlers never need to inspect a
/// string tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Message {
    /// Raw text captured from the child's output.
    Echo(String),
    /// An arbitrary serialisable value.
    Application(Value),
    /// A failure raised inside the child.
    Exception(ExceptionEnvelope),
}

impl Message {
    /// Creates an echo message.
    #[must_use]
    pub fn echo(text: impl Into<String>) -> Self {
        Self::Echo(text.into())
    }

    /// Creates an application message from any serialisable value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the value cannot be represented as
    /// JSON (for example a map with non-string keys).
    pub fn application<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        serde_json::to_value(value)
            .map(Self::Application)
            .map_err(|source| CodecError::Encode { source })
    }

    /// Creates an exception message.
    #[must_use]
    pub const fn exception(envelope: ExceptionEnvelope) -> Self {
        Self::Exception(envelope)
    }

    /// Returns the wire discriminator for this message.
    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        match self {
            Self::Echo(_) => MessageKind::Echo,
            Self::Application(_) => MessageKind::Application,
            Self::Exception(_) => MessageKind::Exception,
        }
    }

    /// Serialises the message to its JSON wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialisation fails.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|source| CodecError::Encode { source })
    }

    /// Parses a message from its JSON wire bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Malformed`] when the bytes are not a JSON object
    /// with a string `type` and a `payload`, or when the payload does not
    /// match the shape required by the tag. Returns
    /// [`CodecError::UnknownType`] when the tag is not a [`MessageKind`].
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|source| CodecError::Malformed {
                message: String::from("message is not valid JSON"),
                source: Some(source),
            })?;

        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| CodecError::Malformed {
                message: String::from("message has no string 'type' field"),
                source: None,
            })?;

        if tag.parse::<MessageKind>().is_err() {
            return Err(CodecError::UnknownType { tag });
        }

        if value.get("payload").is_none() {
            return Err(CodecError::Malformed {
                message: format!("'{tag}' message has no payload"),
                source: None,
            });
        }

        serde_json::from_value(value).map_err(|source| CodecError::Malformed {
            message: format!("payload does not match the '{tag}' message shape"),
            source: Some(source),
        })
    }
}
