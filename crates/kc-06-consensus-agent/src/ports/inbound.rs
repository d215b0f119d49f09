//! # Inbound Ports

use kc_01_block_model::{Block, Transaction};

use crate::domain::{AgentState, PeerAddress};

/// Announce locally accepted objects to one peer.
///
/// Implementations queue the announcement; whether it is sent depends on
/// the agent's state, the peer's subscription and its known inventory.
pub trait PeerRelay: Send + Sync {
    fn peer(&self) -> &PeerAddress;

    fn state(&self) -> AgentState;

    /// Returns `false` once the connection is gone.
    fn relay_block(&self, block: &Block) -> bool;

    /// Returns `false` once the connection is gone.
    fn relay_transaction(&self, tx: &Transaction) -> bool;
}
