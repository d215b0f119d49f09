//! # Domain Errors
//!
//! Error types for consensus agents and the mempool.

use kc_02_chain_proof::ProofError;
use kc_04_blockchain::BlockchainError;
use kc_05_wire_protocol::{ProtocolError, RejectCode};
use shared_types::{ErrorKind, Hash};
use thiserror::Error;

/// Result type alias for agent operations
pub type AgentResult<T> = Result<T, AgentError>;

/// Transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Channel closed")]
    Closed,

    #[error("Transport error: {0}")]
    Io(String),
}

/// Transaction refused by the mempool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MempoolError {
    /// Transaction already pooled.
    #[error("Duplicate transaction {0}")]
    Duplicate(Hash),

    #[error("Fee {fee} below minimum {min}")]
    FeeTooLow { fee: u64, min: u64 },

    #[error("Mempool full ({capacity} transactions)")]
    Full { capacity: usize },

    /// Another pooled transaction spends the same sender nonce.
    #[error("Nonce {nonce} of sender already pooled by {existing}")]
    NonceConflict { nonce: u32, existing: Hash },
}

impl MempoolError {
    /// Code sent back in a `Reject`.
    pub fn reject_code(&self) -> RejectCode {
        match self {
            Self::Duplicate(_) | Self::NonceConflict { .. } => RejectCode::Duplicate,
            Self::FeeTooLow { .. } => RejectCode::InsufficientFee,
            Self::Full { .. } => RejectCode::Obsolete,
        }
    }
}

/// Consensus agent error types.
#[derive(Debug, Clone, Error)]
pub enum AgentError {
    /// Frame failed to parse.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Block refused by the blockchain.
    #[error(transparent)]
    Blockchain(#[from] BlockchainError),

    /// Chain proof failed verification.
    #[error("Chain proof rejected: {0}")]
    Proof(#[from] ProofError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error("Handshake not completed in time")]
    HandshakeTimeout,

    /// An outstanding request went unanswered.
    #[error("No answer to {0} in time")]
    RequestTimeout(&'static str),

    /// Local failure not caused by the peer.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Classify for penalty decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Protocol(err) => err.kind(),
            Self::Blockchain(err) => err.kind(),
            Self::Proof(err) => err.kind(),
            Self::Channel(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::HandshakeTimeout => ErrorKind::HandshakeTimeout,
            Self::RequestTimeout(_) => ErrorKind::SyncTimeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_05_wire_protocol::MessageType;

    #[test]
    fn test_kinds() {
        assert_eq!(
            AgentError::from(ProtocolError::UnknownMessageType(99)).kind(),
            ErrorKind::UnknownMessageType
        );
        assert_eq!(
            AgentError::from(ProtocolError::ChecksumMismatch {
                expected: 1,
                actual: 2
            })
            .kind(),
            ErrorKind::CorruptMessage
        );
        assert_eq!(
            AgentError::from(ProtocolError::Malformed {
                message_type: MessageType::Block,
                source: shared_types::CodecError::TrailingBytes(1),
            })
            .kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(AgentError::HandshakeTimeout.kind(), ErrorKind::HandshakeTimeout);
        assert_eq!(
            AgentError::RequestTimeout("getblocks").kind(),
            ErrorKind::SyncTimeout
        );
        assert_eq!(
            AgentError::from(BlockchainError::Orphan {
                hash: Hash([1; 32]),
                parent: Hash([2; 32]),
            })
            .kind(),
            ErrorKind::Orphan
        );
    }

    #[test]
    fn test_reject_codes() {
        assert_eq!(
            MempoolError::Duplicate(Hash::ZERO).reject_code(),
            RejectCode::Duplicate
        );
        assert_eq!(
            MempoolError::FeeTooLow { fee: 1, min: 2 }.reject_code(),
            RejectCode::InsufficientFee
        );
    }
}
