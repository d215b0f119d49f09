//! # Error Taxonomy
//!
//! Every subsystem keeps its own error enum. At the peer boundary those
//! errors collapse into one [`ErrorKind`], and connection handling decides
//! what to do with a peer from the kind alone.

use serde::{Deserialize, Serialize};

/// Cross-subsystem classification of a failure caused by peer input or
/// peer behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Field fails a basic shape or range check.
    MalformedInput,
    /// Block violates a consensus rule.
    InvalidBlock,
    /// Transaction violates a consensus rule.
    InvalidTransaction,
    /// Block is valid but its parent is unknown.
    Orphan,
    /// Frame checksum mismatch.
    CorruptMessage,
    /// Frame type outside the allow-list.
    UnknownMessageType,
    /// Peer never completed the handshake.
    HandshakeTimeout,
    /// Peer stopped answering sync requests.
    SyncTimeout,
    /// Chain proof failed its consistency checks.
    InvalidProof,
    /// Local failure not attributable to the peer.
    Internal,
}

impl ErrorKind {
    /// Failures that end the connection outright.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CorruptMessage
                | Self::UnknownMessageType
                | Self::HandshakeTimeout
                | Self::SyncTimeout
                | Self::InvalidBlock
        )
    }

    /// Liveness failures close the connection without banning the address.
    pub fn is_liveness(&self) -> bool {
        matches!(self, Self::HandshakeTimeout | Self::SyncTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphan_is_not_fatal() {
        assert!(!ErrorKind::Orphan.is_fatal());
        assert!(!ErrorKind::MalformedInput.is_fatal());
        assert!(ErrorKind::CorruptMessage.is_fatal());
    }

    #[test]
    fn test_timeouts_are_liveness() {
        assert!(ErrorKind::SyncTimeout.is_liveness());
        assert!(!ErrorKind::UnknownMessageType.is_liveness());
    }
}
