//! Dynamic Difficulty Adjustment
//!
//! Sliding-window retarget: the next target is the window's average target
//! scaled by how far the window's actual duration strayed from
//! `window * block_time`.
//!
//! Windows that reach before genesis are padded with virtual blocks spaced
//! exactly `block_time` apart at difficulty 1, so a young chain retargets
//! smoothly instead of reacting to its first few blocks.
//!
//! REMEMBER: Target is a CEILING. Lower target = harder!

use primitive_types::U256;

use crate::config::ConsensusPolicy;
use crate::domain::target::CompactTarget;

/// Chain data the retarget rule reads for the block after `head`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetargetWindow {
    /// Height of the block the next one builds on
    pub head_height: u32,
    /// Timestamp of that block
    pub head_timestamp: u32,
    /// Timestamp of the block at `max(head_height - window, 1)`
    pub tail_timestamp: u32,
    /// Total work at head minus total work at the tail block
    pub delta_total_work: u64,
}

impl RetargetWindow {
    /// Height of the tail block for a head at `head_height`.
    pub fn tail_height(policy: &ConsensusPolicy, head_height: u32) -> u32 {
        head_height
            .saturating_sub(policy.difficulty_adjustment_blocks)
            .max(1)
    }
}

/// Compact target required of the block after the window's head.
pub fn next_target(policy: &ConsensusPolicy, window: &RetargetWindow) -> CompactTarget {
    let blocks = u64::from(policy.difficulty_adjustment_blocks.max(1));
    let mut actual_time =
        u64::from(window.head_timestamp.saturating_sub(window.tail_timestamp));
    let mut delta_work = window.delta_total_work;

    if u64::from(window.head_height) <= blocks {
        let virtual_blocks = blocks - u64::from(window.head_height) + 1;
        actual_time = actual_time.saturating_add(virtual_blocks * policy.block_time);
        delta_work = delta_work.saturating_add(virtual_blocks);
    }

    let expected_time = blocks * policy.block_time;
    let factor = policy.max_adjustment_factor.max(1);
    let lower = (expected_time / factor).max(1);
    let upper = expected_time.saturating_mul(factor).max(lower);
    let clamped_time = actual_time.clamp(lower, upper);

    let average_difficulty = (delta_work / blocks).max(1);
    let average_target = policy.block_target_max / U256::from(average_difficulty);

    // new = avg * actual / expected, split into quotient and remainder so the
    // multiplication cannot overflow.
    let quotient = average_target / U256::from(expected_time.max(1));
    let remainder = average_target % U256::from(expected_time.max(1));
    let next = quotient
        .saturating_mul(U256::from(clamped_time))
        .saturating_add(
            remainder.saturating_mul(U256::from(clamped_time)) / U256::from(expected_time.max(1)),
        );

    let clamped = next.clamp(U256::one(), policy.block_target_max);
    // Reduce precision to what nBits can carry.
    CompactTarget::from_target(clamped)
}
