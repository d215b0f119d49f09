//! Genesis Block Creation
//!
//! The genesis block bootstraps the chain. It is trusted by hash, so it is
//! not mined: every node derives the same block from the same
//! [`GenesisConfig`].

use serde::{Deserialize, Serialize};
use shared_types::{Address, Hash};

use crate::config::ConsensusPolicy;
use crate::domain::block::Block;
use crate::domain::body::Body;
use crate::domain::header::Header;
use crate::domain::interlink::Interlink;
use crate::error::BlockResult;

/// Parameters that fix the genesis block of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Genesis timestamp (unix seconds)
    pub timestamp: u32,
    /// Address named in the genesis body
    pub miner_address: Address,
    /// Free-form extra data, at most 255 bytes
    pub extra_data: Vec<u8>,
    /// Initial account-tree root
    pub accounts_hash: Hash,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            timestamp: 1_700_000_000,
            miner_address: Address::ZERO,
            extra_data: b"kestrel-chain genesis".to_vec(),
            accounts_hash: Hash::ZERO,
        }
    }
}

/// Creates the genesis block from configuration
pub fn create_genesis_block(
    policy: &ConsensusPolicy,
    config: &GenesisConfig,
) -> BlockResult<Block> {
    let body = Body::new(config.miner_address, config.extra_data.clone(), vec![])?;
    let interlink = Interlink::empty();

    let header = Header {
        version: 1,
        prev_hash: Hash::ZERO,
        interlink_hash: interlink.hash(&Hash::ZERO),
        body_hash: body.hash(),
        accounts_hash: config.accounts_hash,
        n_bits: policy.max_compact(),
        height: 1,
        timestamp: config.timestamp,
        nonce: 0,
    };

    Ok(Block::new(header, interlink, Some(body)))
}
