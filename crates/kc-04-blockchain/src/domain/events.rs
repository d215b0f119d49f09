//! Push outcomes and chain events.

use kc_01_block_model::Block;
use shared_types::Hash;

use super::errors::InvalidReason;

/// Outcome of a successful [`push_block`](crate::Blockchain::push_block).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushResult {
    /// Already stored; nothing changed
    Known,
    /// Appended to the main chain
    Extended,
    /// A heavier fork became the main chain
    Rebranched,
    /// Stored on a fork that does not outweigh the main chain
    Forked,
}

/// Notification delivered to every [`ChainListener`](crate::ChainListener).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// The main chain head moved.
    HeadChanged {
        head: Block,
        /// Newly applied blocks, oldest first
        applied: Vec<Block>,
        /// Reverted blocks, newest first
        reverted: Vec<Block>,
    },
    /// A pushed block failed validation.
    BlockRejected { hash: Hash, reason: InvalidReason },
}

impl ChainEvent {
    pub fn is_head_changed(&self) -> bool {
        matches!(self, Self::HeadChanged { .. })
    }
}

/// Walk direction along the main chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Toward the head
    Forward,
    /// Toward genesis
    Backward,
}
