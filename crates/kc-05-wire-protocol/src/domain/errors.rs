//! # Domain Errors
//!
//! Error types for the wire protocol.

use shared_types::{CodecError, ErrorKind};
use thiserror::Error;

use super::message_type::MessageType;

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Type tag outside the message table.
    #[error("Unknown message type {0:#010x}")]
    UnknownMessageType(u32),

    #[error("Bad magic {0:#010x}")]
    BadMagic(u32),

    /// Declared frame length differs from the bytes received.
    #[error("Frame declares {declared} bytes, received {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("Frame of {len} bytes exceeds maximum {max}")]
    FrameTooLarge { len: usize, max: usize },

    /// Frame checksum does not match its contents.
    #[error("Checksum mismatch: frame carries {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Frame header could not be read.
    #[error("Truncated frame: {0}")]
    Truncated(CodecError),

    /// Payload did not decode.
    #[error("Malformed {message_type} payload: {source}")]
    Malformed {
        message_type: MessageType,
        source: CodecError,
    },

    /// A constructor was handed a field over its bound.
    #[error("Field `{field}` has {len} entries, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A constructor was handed an out-of-domain value.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl ProtocolError {
    /// Classify for peer handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMessageType(_) => ErrorKind::UnknownMessageType,
            Self::ChecksumMismatch { .. } => ErrorKind::CorruptMessage,
            _ => ErrorKind::MalformedInput,
        }
    }

    pub(crate) fn check_len(field: &'static str, len: usize, max: usize) -> ProtocolResult<()> {
        if len > max {
            return Err(Self::FieldTooLong { field, len, max });
        }
        Ok(())
    }

    /// Printable ASCII of at most `max` bytes.
    pub(crate) fn check_ascii(field: &'static str, value: &str, max: usize) -> ProtocolResult<()> {
        Self::check_len(field, value.len(), max)?;
        if !value.bytes().all(|byte| (0x20..=0x7E).contains(&byte)) {
            return Err(Self::InvalidField {
                field,
                reason: "not printable ASCII".into(),
            });
        }
        Ok(())
    }
}
