//! What a failure costs the peer that caused it.

use shared_types::ErrorKind;

/// Consequence of a failure attributed to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Penalty {
    /// Not the peer's fault, or harmless
    None,
    /// Counted; a ban follows after `max_strikes`
    Strike,
    /// Close without banning
    Disconnect,
    /// Close and ban the address
    Ban,
}

/// Penalty for a failure of `kind`.
///
/// `InvalidProof` maps to a ban; callers pass it only for proofs that
/// contradict themselves.
pub fn penalty_for(kind: ErrorKind) -> Penalty {
    match kind {
        ErrorKind::CorruptMessage
        | ErrorKind::UnknownMessageType
        | ErrorKind::InvalidBlock
        | ErrorKind::InvalidProof => Penalty::Ban,
        ErrorKind::MalformedInput | ErrorKind::InvalidTransaction => Penalty::Strike,
        ErrorKind::HandshakeTimeout | ErrorKind::SyncTimeout => Penalty::Disconnect,
        ErrorKind::Orphan | ErrorKind::Internal => Penalty::None,
    }
}
