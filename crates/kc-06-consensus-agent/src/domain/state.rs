//! Connection states and close reasons.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::ErrorKind;

/// Transport-level address of a peer. Bans are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerAddress(pub String);

impl PeerAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    /// Transport up, nothing sent yet
    Connecting,
    /// `Version` sent, waiting for the peer's `Version` and `VerAck`
    Handshake,
    /// Downloading the peer's chain
    Syncing,
    /// Caught up; relaying
    Established,
    /// Terminal
    Closed,
}

impl AgentState {
    /// Handshake finished and the connection is still open.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Syncing | Self::Established)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Handshake => "handshake",
            Self::Syncing => "syncing",
            Self::Established => "established",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Why a connection ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseReason {
    /// Transport closed by the peer
    PeerClosed,
    /// Local node shutting down
    Shutdown,
    /// Closed through the agent handle
    Requested,
    /// The address was already banned
    Banned,
    /// Our own challenge nonce came back
    SelfConnection,
    /// Different genesis or protocol version
    Incompatible,
    HandshakeTimeout,
    /// A `GetBlocks`, `GetData`, `GetChainProof` or ping went unanswered
    RequestTimeout,
    /// Fork blocks during sync that do not chain onto each other
    ConspicuousFork,
    /// Peer input of the given kind
    Misbehaviour(ErrorKind),
    /// Sending a frame failed
    TransportError,
}

impl CloseReason {
    /// Whether the peer's address is banned on this close.
    pub fn bans_peer(self) -> bool {
        matches!(self, Self::Misbehaviour(_))
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed"),
            Self::Shutdown => f.write_str("shutdown"),
            Self::Requested => f.write_str("requested"),
            Self::Banned => f.write_str("address banned"),
            Self::SelfConnection => f.write_str("connected to self"),
            Self::Incompatible => f.write_str("incompatible peer"),
            Self::HandshakeTimeout => f.write_str("handshake timeout"),
            Self::RequestTimeout => f.write_str("request timeout"),
            Self::ConspicuousFork => f.write_str("conspicuous fork"),
            Self::Misbehaviour(kind) => write!(f, "misbehaviour ({kind:?})"),
            Self::TransportError => f.write_str("transport error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_states() {
        assert!(!AgentState::Handshake.is_ready());
        assert!(AgentState::Syncing.is_ready());
        assert!(AgentState::Established.is_ready());
        assert!(!AgentState::Closed.is_ready());
    }

    #[test]
    fn test_only_misbehaviour_bans() {
        assert!(CloseReason::Misbehaviour(ErrorKind::CorruptMessage).bans_peer());
        assert!(!CloseReason::ConspicuousFork.bans_peer());
        assert!(!CloseReason::HandshakeTimeout.bans_peer());
        assert!(!CloseReason::RequestTimeout.bans_peer());
        assert!(!CloseReason::SelfConnection.bans_peer());
    }
}
