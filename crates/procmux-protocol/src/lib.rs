//! Wire protocol shared by pool controllers and their child processes.
//!
//! Children report back to the controller by writing one encoded
//! [`Message`] per line on their standard streams. A message is a closed
//! tagged variant: free-form echo text, an application payload, or an
//! [`ExceptionEnvelope`] describing a failure.
//!
//! A [`Codec`] turns a message into a single line that is guaranteed to
//! contain no newline, and back again. The default [`Base64Codec`] encodes the
//! JSON form of the message as standard base64; [`JsonCodec`] writes compact
//! JSON instead and is handy when a human needs to read the stream.
//!
//! # Example
//!
//! ```
//! use procmux_protocol::{Base64Codec, Codec, Message};
//!
//! let codec = Base64Codec;
//! let message = Message::echo("hello\nworld");
//! let line = codec.encode(&message).expect("encode");
//! assert!(!line.contains('\n'));
//! assert_eq!(codec.decode(&line).expect("decode"), message);
//! ```

pub mod codec;
pub mod envelope;
pub mod error;
pub mod message;

pub use self::codec::{Base64Codec, Codec, JsonCodec};
pub use self::envelope::{ArgSummary, ExceptionEnvelope, StackFrame, Summarize};
pub use self::error::CodecError;
pub use self::message::{Message, MessageKind};
