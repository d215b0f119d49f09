//! Error types for the block model

use shared_types::{CodecError, ErrorKind, Hash};
use thiserror::Error;

/// Result type alias for block model operations
pub type BlockResult<T> = std::result::Result<T, BlockError>;

/// Errors raised while constructing or validating blocks
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// Bytes could not be decoded
    #[error("Malformed block data: {0}")]
    Codec(#[from] CodecError),

    /// Header version not in the supported set
    #[error("Unsupported header version {0}")]
    UnsupportedVersion(u16),

    /// Compact target outside the valid range
    #[error("Invalid compact target {0:#010x}")]
    InvalidTarget(u32),

    /// Header hash above its own target
    #[error("Invalid proof of work")]
    InvalidProofOfWork,

    /// Timestamp too far ahead of local time
    #[error("Timestamp {timestamp} is more than {drift}s ahead of local time {now}")]
    TimestampTooFarInFuture { timestamp: u64, now: u64, drift: u64 },

    /// Header does not commit to the attached interlink
    #[error("Interlink hash mismatch")]
    InterlinkHashMismatch,

    /// Header does not commit to the attached body
    #[error("Body hash mismatch")]
    BodyHashMismatch,

    /// Serialized block exceeds the size limit
    #[error("Block too large: {size} bytes, limit {max}")]
    BlockTooLarge { size: usize, max: usize },

    /// Body lists the same transaction twice
    #[error("Duplicate transaction {0}")]
    DuplicateTransaction(Hash),

    /// Transaction failed a stateless check
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    /// A bounded field exceeds its limit
    #[error("Field `{field}` too long: {len} > {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

impl BlockError {
    /// Classify for peer handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Codec(_) | Self::FieldTooLong { .. } | Self::UnsupportedVersion(_) => {
                ErrorKind::MalformedInput
            }
            Self::InvalidTransaction(_) => ErrorKind::InvalidTransaction,
            _ => ErrorKind::InvalidBlock,
        }
    }
}

impl From<BlockError> for CodecError {
    fn from(err: BlockError) -> Self {
        match err {
            BlockError::Codec(inner) => inner,
            BlockError::FieldTooLong { field, len, max } => {
                CodecError::LengthExceeded { field, len, max }
            }
            other => CodecError::invalid("block", other.to_string()),
        }
    }
}
