// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wire codecs over the runtime value model.
//!
//! All codecs walk descriptors at runtime; nothing here is generated
//! per-type. [`Serializer`] is object-safe so transports can carry a
//! `Box<dyn Serializer>` chosen by content negotiation.

mod binary;
mod fast_binary;
mod framed;
mod json;

pub use binary::BinarySerializer;
pub use fast_binary::FastBinarySerializer;
pub use framed::{FrameReader, FrameWriter, DEFAULT_MAX_FRAME_SIZE};
pub use json::JsonSerializer;

use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::descriptor::MessageDescriptor;
use crate::value::{MessageValue, ValidationError};

/// Encoding or decoding a message failed.
#[derive(Debug)]
pub enum SerializeError {
    Io(std::io::Error),
    /// Input ended inside a value.
    UnexpectedEnd,
    /// A wire-level tag or token that no format version defines.
    BadWireType { tag: u8 },
    /// Structurally broken input, with a human-readable reason.
    Malformed(String),
    /// The decoded message failed descriptor validation.
    Validation(ValidationError),
    /// A frame outgrew the writer's configured capacity.
    FrameSizeExceeded {
        needed: usize,
        remaining: usize,
        total: usize,
    },
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {}", e),
            Self::UnexpectedEnd => write!(f, "unexpected end of input"),
            Self::BadWireType { tag } => write!(f, "unknown wire type tag {}", tag),
            Self::Malformed(reason) => write!(f, "malformed input: {}", reason),
            Self::Validation(e) => write!(f, "validation failed: {}", e),
            Self::FrameSizeExceeded {
                needed,
                remaining,
                total,
            } => write!(
                f,
                "frame size exceeded: needed {} bytes, {} of {} remaining",
                needed, remaining, total
            ),
        }
    }
}

impl std::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SerializeError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEnd
        } else {
            Self::Io(e)
        }
    }
}

impl From<ValidationError> for SerializeError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<serde_json::Error> for SerializeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// A message codec. Implementations are stateless and cheap to share.
pub trait Serializer: Send + Sync {
    /// Whether the output is a binary protocol, as opposed to
    /// printable text.
    fn binary_protocol(&self) -> bool;

    /// Encode one message, returning the number of bytes written.
    fn serialize(
        &self,
        out: &mut dyn Write,
        message: &MessageValue,
    ) -> Result<usize, SerializeError>;

    /// Decode one message of the given type from the stream, leaving
    /// the stream positioned after it.
    fn deserialize(
        &self,
        input: &mut dyn Read,
        descriptor: &Arc<MessageDescriptor>,
    ) -> Result<MessageValue, SerializeError>;
}
