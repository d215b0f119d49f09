//! # Outbound Ports
//!
//! Dependencies of a consensus agent:
//!
//! - [`PeerChannel`]: frame transport to one peer
//! - [`Mempool`]: unconfirmed transactions

use async_trait::async_trait;
use kc_01_block_model::{Block, Transaction};
use shared_types::Hash;

use crate::domain::{ChannelError, MempoolError, PeerAddress};

/// Bidirectional frame transport to one peer.
///
/// Frames are whole messages as produced by `MessageFactory::encode`.
/// `recv` must be cancel-safe: the agent polls it inside `select!`.
#[async_trait]
pub trait PeerChannel: Send {
    fn peer_address(&self) -> &PeerAddress;

    async fn send(&mut self, frame: Vec<u8>) -> Result<(), ChannelError>;

    /// Next frame, `None` once the peer closed the transport.
    async fn recv(&mut self) -> Option<Vec<u8>>;

    /// Close the transport. Idempotent.
    async fn close(&mut self);
}

/// Pool of unconfirmed transactions.
pub trait Mempool: Send + Sync {
    /// Admit a transaction. Returns its hash.
    fn push_transaction(&self, tx: Transaction) -> Result<Hash, MempoolError>;

    fn get(&self, hash: &Hash) -> Option<Transaction>;

    fn contains(&self, hash: &Hash) -> bool;

    /// Up to `max` transactions, highest fee first.
    fn transactions_for_block(&self, max: usize) -> Vec<Transaction>;

    /// Every pooled transaction, in admission order.
    fn transactions(&self) -> Vec<Transaction>;

    /// Drop transactions included in `block` and any that now conflict
    /// with it. Returns how many were dropped.
    fn evict_applied(&self, block: &Block) -> usize;

    /// Re-admit the transactions of a reverted block.
    fn restore_reverted(&self, block: &Block) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
