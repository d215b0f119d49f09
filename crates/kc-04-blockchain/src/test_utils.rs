//! Chain builders for tests.

use kc_01_block_model::test_utils::{empty_body, genesis_block, mine_header};
use kc_01_block_model::{Block, Body};
use kc_03_chain_store::{BlockchainStore, KeyValueStore};
use shared_types::Address;

use crate::adapters::InMemoryAccountTree;
use crate::config::BlockchainConfig;
use crate::ports::outbound::AccountTree;
use crate::service::Blockchain;

/// In-memory chain on the testing policy and test genesis.
pub fn test_blockchain() -> Blockchain {
    let config = BlockchainConfig::for_testing();
    let genesis = genesis_block(&config.policy);
    Blockchain::in_memory(config, genesis).expect("fresh chain opens")
}

/// In-memory chain whose account tree starts with `balances`.
pub fn funded_blockchain(balances: impl IntoIterator<Item = (Address, u64)>) -> Blockchain {
    let config = BlockchainConfig::for_testing();
    let genesis = genesis_block(&config.policy);
    let accounts = InMemoryAccountTree::with_balances(config.policy.block_reward, balances);
    Blockchain::new(config, genesis, accounts, BlockchainStore::in_memory())
        .expect("fresh chain opens")
}

/// Solve the proof of work of a template.
pub fn mine(mut block: Block) -> Block {
    mine_header(&mut block.header);
    block
}

/// Mined block on top of the head carrying `body`, one `block_time` after
/// the head.
pub async fn mine_next_with<A, S>(chain: &Blockchain<A, S>, body: Body) -> Block
where
    A: AccountTree,
    S: KeyValueStore,
{
    let timestamp = chain.head().header.timestamp + chain.policy().block_time as u32;
    let template = chain
        .block_template(body, timestamp)
        .await
        .expect("template on head");
    mine(template)
}

/// Mined empty block on top of the head paying `miner`.
pub async fn mine_next<A, S>(chain: &Blockchain<A, S>, miner: Address) -> Block
where
    A: AccountTree,
    S: KeyValueStore,
{
    mine_next_with(chain, empty_body(miner)).await
}

/// Mine and push `count` empty blocks, returning them oldest first.
pub async fn extend<A, S>(chain: &Blockchain<A, S>, count: usize, miner: Address) -> Vec<Block>
where
    A: AccountTree,
    S: KeyValueStore,
{
    let mut blocks = Vec::with_capacity(count);
    for _ in 0..count {
        let block = mine_next(chain, miner).await;
        chain
            .push_block(block.clone())
            .await
            .expect("mined block extends the head");
        blocks.push(block);
    }
    blocks
}
