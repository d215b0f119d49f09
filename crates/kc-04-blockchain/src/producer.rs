//! # Block Producer
//!
//! Candidate blocks for a miner: a template on top of the current head,
//! then a bounded nonce search.

use std::sync::Arc;

use kc_01_block_model::{Block, Body, Transaction};
use kc_03_chain_store::{InMemoryKVStore, KeyValueStore};
use shared_types::{Address, TimeSource};
use tracing::debug;

use crate::adapters::InMemoryAccountTree;
use crate::domain::BlockchainResult;
use crate::ports::outbound::AccountTree;
use crate::service::Blockchain;

/// Builds blocks paying one miner address.
pub struct BlockProducer<A = InMemoryAccountTree, S = InMemoryKVStore>
where
    A: AccountTree,
    S: KeyValueStore,
{
    blockchain: Arc<Blockchain<A, S>>,
    miner_address: Address,
    extra_data: Vec<u8>,
}

impl<A, S> BlockProducer<A, S>
where
    A: AccountTree,
    S: KeyValueStore,
{
    pub fn new(blockchain: Arc<Blockchain<A, S>>, miner_address: Address) -> Self {
        Self {
            blockchain,
            miner_address,
            extra_data: Vec::new(),
        }
    }

    /// Extra data written into every body.
    pub fn with_extra_data(mut self, extra_data: Vec<u8>) -> Self {
        self.extra_data = extra_data;
        self
    }

    /// Unmined template on the current head.
    ///
    /// # Errors
    /// - `Body` if the body exceeds its bounds
    /// - `Accounts` if the transactions do not apply to the head state
    pub async fn template(
        &self,
        transactions: Vec<Transaction>,
        timestamp: u32,
    ) -> BlockchainResult<Block> {
        let body = Body::new(self.miner_address, self.extra_data.clone(), transactions)?;
        self.blockchain.block_template(body, timestamp).await
    }

    /// Template timestamped by `clock`, solved within `max_attempts` nonces.
    /// `Ok(None)` when no nonce in range meets the target.
    pub async fn produce(
        &self,
        transactions: Vec<Transaction>,
        clock: &dyn TimeSource,
        max_attempts: u32,
    ) -> BlockchainResult<Option<Block>> {
        let timestamp = u32::try_from(clock.now()).unwrap_or(u32::MAX);
        let template = self.template(transactions, timestamp).await?;
        Ok(solve(template, max_attempts))
    }
}

/// Search nonces `0..max_attempts` for one meeting the header's target.
pub fn solve(mut block: Block, max_attempts: u32) -> Option<Block> {
    for nonce in 0..max_attempts {
        block.header.nonce = nonce;
        if block.header.verify_proof_of_work() {
            debug!(hash = %block.hash(), nonce, "Solved block");
            return Some(block);
        }
    }
    None
}
