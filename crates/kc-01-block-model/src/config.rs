//! Consensus policy constants.
//!
//! Every node on a network must run with an identical policy; these values
//! are protocol constants, not tuning knobs.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::domain::target::CompactTarget;

/// Consensus policy consumed by block validation and retargeting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusPolicy {
    /// Target time between blocks (in seconds)
    pub block_time: u64,

    /// Coins created by each block, paid to the miner with the fees
    pub block_reward: u64,

    /// Maximum serialized block size (in bytes)
    pub block_size_max: usize,

    /// Number of blocks in the sliding retarget window
    pub difficulty_adjustment_blocks: u32,

    /// Maximum retarget factor per block, in either direction
    pub max_adjustment_factor: u64,

    /// Easiest allowed target; a block at this target has difficulty 1
    pub block_target_max: U256,

    /// How far ahead of local time a block timestamp may be (in seconds)
    pub timestamp_drift_max: u64,

    /// Dense suffix length of chain proofs
    pub proof_suffix_length: usize,
}

impl Default for ConsensusPolicy {
    fn default() -> Self {
        Self {
            block_time: 60,
            block_reward: 440_000,
            block_size_max: 100_000,
            difficulty_adjustment_blocks: 120,
            max_adjustment_factor: 2,
            // 2^240: sixteen leading zero bits at difficulty 1
            block_target_max: U256::from(2).pow(U256::from(240)),
            timestamp_drift_max: 600,
            proof_suffix_length: 50,
        }
    }
}

impl ConsensusPolicy {
    /// Policy with a trivial target so tests mine blocks in a few hashes.
    pub fn for_testing() -> Self {
        Self {
            // 2^252: one in sixteen hashes meets difficulty 1
            block_target_max: U256::from(2).pow(U256::from(252)),
            difficulty_adjustment_blocks: 10,
            proof_suffix_length: 5,
            ..Self::default()
        }
    }

    /// Compact form of `block_target_max`.
    pub fn max_compact(&self) -> CompactTarget {
        CompactTarget::from_target(self.block_target_max)
    }

    /// Difficulty of a compact target, `block_target_max / target`,
    /// saturated into `u64`. Zero for an unusable target.
    pub fn difficulty(&self, n_bits: CompactTarget) -> u64 {
        let target = n_bits.to_target();
        if target.is_zero() {
            return 0;
        }
        let ratio = self.block_target_max / target;
        if ratio > U256::from(u64::MAX) {
            u64::MAX
        } else {
            ratio.low_u64()
        }
    }
}
