//! # Outbound Ports
//!
//! Read access to stored blocks while a proof is built.

use kc_01_block_model::Block;
use shared_types::Hash;

/// Block source for proof construction - outbound port.
pub trait BlockLookup {
    /// Block (light or full) by hash, `None` if unknown.
    fn block_by_hash(&self, hash: &Hash) -> Option<Block>;
}

impl BlockLookup for std::collections::HashMap<Hash, Block> {
    fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.get(hash).cloned()
    }
}
