//! How a child renders the messages it emits.

use std::fmt;
use std::sync::Arc;

use procmux_protocol::{Base64Codec, Codec, Message};

use crate::error::EmitError;

/// Output style for emitted messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmitMode {
    /// One codec line per message, for a supervising controller.
    #[default]
    Encoded,
    /// Pretty-printed JSON, for a person running the child by hand.
    Plain,
}

/// Capture settings passed explicitly to everything that writes messages.
#[derive(Clone)]
pub struct CaptureConfig {
    mode: EmitMode,
    codec: Arc<dyn Codec>,
}

impl CaptureConfig {
    /// Creates settings with the given mode and codec.
    #[must_use]
    pub fn new(mode: EmitMode, codec: impl Codec + 'static) -> Self {
        Self {
            mode,
            codec: Arc::new(codec),
        }
    }

    /// Encoded output using `codec`.
    #[must_use]
    pub fn encoded(codec: impl Codec + 'static) -> Self {
        Self::new(EmitMode::Encoded, codec)
    }

    /// Human-readable output.
    #[must_use]
    pub fn plain() -> Self {
        Self::new(EmitMode::Plain, Base64Codec)
    }

    /// Returns the output style.
    #[must_use]
    pub const fn mode(&self) -> EmitMode {
        self.mode
    }

    /// Returns the codec used in [`EmitMode::Encoded`].
    #[must_use]
    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }

    /// Renders `message` as the text written for it, without a trailing
    /// newline.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Encode`] or [`EmitError::Render`] when the
    /// message cannot be serialised.
    pub fn render(&self, message: &Message) -> Result<String, EmitError> {
        match self.mode {
            EmitMode::Encoded => Ok(self.codec.encode(message)?),
            EmitMode::Plain => {
                serde_json::to_string_pretty(message).map_err(|source| EmitError::Render { source })
            }
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::encoded(Base64Codec)
    }
}

impl fmt::Debug for CaptureConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureConfig")
            .field("mode", &self.mode)
            .field("codec", &self.codec.name())
            .finish()
    }
}
