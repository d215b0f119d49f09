//! # Inbound Ports
//!
//! The API consensus agents and the node host use to drive the chain.

use std::sync::Arc;

use async_trait::async_trait;
use kc_01_block_model::{Block, ConsensusPolicy};
use kc_02_chain_proof::ChainProof;
use shared_types::Hash;

use crate::domain::{BlockchainResult, Direction, PushResult};
use crate::ports::outbound::ChainListener;

/// Blockchain API - inbound port.
#[async_trait]
pub trait BlockchainApi: Send + Sync {
    /// Consensus rules this chain enforces.
    fn policy(&self) -> &ConsensusPolicy;

    fn genesis_hash(&self) -> Hash;

    /// Current main chain head. Never waits on a running push.
    fn head(&self) -> Block;

    fn head_hash(&self) -> Hash;

    fn height(&self) -> u32;

    fn total_work(&self) -> u64;

    /// Validate and attach a block, possibly reorganizing the main chain.
    async fn push_block(&self, block: Block) -> BlockchainResult<PushResult>;

    /// Block by hash; fork blocks only with `include_forks`.
    async fn get_block(&self, hash: &Hash, include_forks: bool)
        -> BlockchainResult<Option<Block>>;

    /// Main chain block at `height`.
    async fn get_block_at(&self, height: u32) -> BlockchainResult<Option<Block>>;

    /// Whether the block is stored on any chain.
    async fn contains(&self, hash: &Hash) -> BlockchainResult<bool>;

    /// Locator hashes for the current main chain.
    async fn block_locators(&self) -> BlockchainResult<Vec<Hash>>;

    /// Up to `count` main chain hashes next to the first known locator.
    async fn blocks_after(
        &self,
        locators: &[Hash],
        count: usize,
        direction: Direction,
    ) -> BlockchainResult<Vec<Hash>>;

    /// Proof of the current main chain.
    async fn chain_proof(&self) -> BlockchainResult<ChainProof>;

    /// Register a listener; delivery follows registration order.
    fn subscribe(&self, listener: Arc<dyn ChainListener>);
}
