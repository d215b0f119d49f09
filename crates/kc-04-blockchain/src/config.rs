//! Blockchain configuration

use kc_01_block_model::ConsensusPolicy;
use serde::{Deserialize, Serialize};

/// Blockchain configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockchainConfig {
    /// Consensus rules every block is checked against
    pub policy: ConsensusPolicy,

    /// Maximum fork tips tracked besides the main chain; the least-work tip
    /// is evicted first
    pub max_forks: usize,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            policy: ConsensusPolicy::default(),
            max_forks: 32,
        }
    }
}

impl BlockchainConfig {
    /// Config with the testing policy and a small fork budget.
    pub fn for_testing() -> Self {
        Self {
            policy: ConsensusPolicy::for_testing(),
            max_forks: 4,
        }
    }
}
