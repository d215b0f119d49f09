//! Chain builders for tests.
//!
//! Blocks are mined against [`ConsensusPolicy::for_testing`]-style targets,
//! where a valid nonce turns up within a few dozen hashes.

use shared_types::{Address, Hash};

use crate::config::ConsensusPolicy;
use crate::domain::block::Block;
use crate::domain::body::Body;
use crate::domain::genesis::{create_genesis_block, GenesisConfig};
use crate::domain::header::Header;
use crate::domain::target::CompactTarget;

/// Genesis timestamp used by every test chain.
pub const TEST_GENESIS_TIMESTAMP: u32 = 1_700_000_000;

/// Genesis configuration shared by test chains.
pub fn test_genesis_config() -> GenesisConfig {
    GenesisConfig {
        timestamp: TEST_GENESIS_TIMESTAMP,
        miner_address: Address::ZERO,
        extra_data: b"test genesis".to_vec(),
        accounts_hash: Hash::ZERO,
    }
}

/// Genesis block for `policy`.
pub fn genesis_block(policy: &ConsensusPolicy) -> Block {
    create_genesis_block(policy, &test_genesis_config()).expect("valid genesis config")
}

/// Increment the nonce until the header meets its own target.
pub fn mine_header(header: &mut Header) {
    while !header.verify_proof_of_work() {
        header.nonce = header.nonce.wrapping_add(1);
    }
}

/// Mine a child of `parent` with explicit target and timestamp.
pub fn mine_block_with(
    parent: &Block,
    n_bits: CompactTarget,
    timestamp: u32,
    body: Option<Body>,
    accounts_hash: Hash,
) -> Block {
    let interlink = parent.next_interlink();
    let body_hash = body
        .as_ref()
        .map(Body::hash)
        .unwrap_or_else(|| empty_body(Address::ZERO).hash());
    let mut header = Header {
        version: 1,
        prev_hash: parent.hash(),
        interlink_hash: interlink.hash(&parent.hash()),
        body_hash,
        accounts_hash,
        n_bits,
        height: parent.height() + 1,
        timestamp,
        nonce: 0,
    };
    mine_header(&mut header);
    Block::new(header, interlink, body)
}

/// Mine a child of `parent` one `block_time` later at the parent's target.
pub fn mine_block(
    policy: &ConsensusPolicy,
    parent: &Block,
    body: Option<Body>,
    accounts_hash: Hash,
) -> Block {
    let timestamp = parent.header.timestamp + policy.block_time as u32;
    mine_block_with(parent, parent.header.n_bits, timestamp, body, accounts_hash)
}

/// Body with no transactions.
pub fn empty_body(miner: Address) -> Body {
    Body::new(miner, vec![], vec![]).expect("empty body within bounds")
}

/// `len` light blocks starting with genesis, all at the maximum target.
pub fn light_chain(policy: &ConsensusPolicy, len: usize) -> Vec<Block> {
    let mut chain = Vec::with_capacity(len);
    let genesis = genesis_block(policy);
    chain.push(genesis.to_light());
    while chain.len() < len {
        let parent = chain.last().expect("chain starts with genesis");
        let block = mine_block(policy, parent, None, Hash::ZERO);
        chain.push(block);
    }
    chain
}
