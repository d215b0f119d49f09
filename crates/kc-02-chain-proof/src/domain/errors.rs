//! # Domain Errors
//!
//! Error types for chain proofs.

use kc_01_block_model::BlockError;
use shared_types::{CodecError, ErrorKind, Hash};
use thiserror::Error;

/// Result type alias for chain proof operations
pub type ProofResult<T> = Result<T, ProofError>;

/// Chain proof error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProofError {
    /// The proof contradicts itself: broken links, bad proof of work or
    /// commitments that do not match.
    #[error("Invalid chain proof: {0}")]
    InvalidProof(String),

    /// The proof is anchored at a different genesis block.
    #[error("Chain proof anchored at {got}, expected genesis {expected}")]
    GenesisMismatch {
        /// Genesis hash this node runs on
        expected: Hash,
        /// First prefix block of the proof
        got: Hash,
    },

    /// A block needed to build the proof is not stored.
    #[error("Block {0} missing while building chain proof")]
    MissingBlock(Hash),

    /// Prefix or suffix exceeds its bound.
    #[error("Chain proof {part} has {len} entries, maximum is {max}")]
    TooLarge {
        /// "prefix" or "suffix"
        part: &'static str,
        /// Entries present
        len: usize,
        /// Entries allowed
        max: usize,
    },

    /// Prefix carries a full block.
    #[error("Chain proof prefix must contain light blocks only")]
    FullBlockInPrefix,
}

impl ProofError {
    /// Classify for peer handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidProof(_) | Self::GenesisMismatch { .. } => ErrorKind::InvalidProof,
            Self::TooLarge { .. } | Self::FullBlockInPrefix => ErrorKind::MalformedInput,
            Self::MissingBlock(_) => ErrorKind::Internal,
        }
    }

    /// Whether the failure proves the sender built a bogus proof, as
    /// opposed to a proof that belongs to another network.
    pub fn is_self_contradictory(&self) -> bool {
        matches!(self, Self::InvalidProof(_))
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidProof(reason.into())
    }
}

impl From<BlockError> for ProofError {
    fn from(err: BlockError) -> Self {
        Self::InvalidProof(err.to_string())
    }
}

impl From<ProofError> for CodecError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::TooLarge { part, len, max } => CodecError::LengthExceeded {
                field: part,
                len,
                max,
            },
            other => CodecError::invalid("chain_proof", other.to_string()),
        }
    }
}
