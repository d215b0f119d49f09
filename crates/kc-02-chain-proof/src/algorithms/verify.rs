//! # Proof Verification
//!
//! Checks the proof's internal consistency and derives the total work it
//! implies.
//!
//! ## Implied work
//!
//! ```text
//! work = difficulty(genesis)
//!      + Σ prefix hops a → b : credit(a, b)
//!      + Σ suffix headers h  : difficulty(h)
//!
//! credit(a, b) = difficulty(b)                                  if b's parent is a
//!              = min(span(a, b) * difficulty(b), 2^level(a) * difficulty(a))   otherwise
//! ```
//!
//! Heights of interlink hops are claims, so a hop is credited no more than
//! the superblock level of its origin proves. Proofs from [`build_proof`]
//! only take hops within that bound, which keeps their work exact whenever
//! the target is constant across each hop.
//!
//! [`build_proof`]: crate::algorithms::build_proof

use kc_01_block_model::{Block, ConsensusPolicy, Header};
use shared_types::Hash;
use tracing::debug;

use crate::domain::{ChainProof, ProofError, ProofResult};

/// Verify `proof` against the local genesis and return its implied total
/// work.
///
/// # Errors
/// - `GenesisMismatch` if the prefix is anchored elsewhere
/// - `InvalidProof` for any broken link, commitment or proof of work
pub fn verify_proof(
    proof: &ChainProof,
    policy: &ConsensusPolicy,
    genesis_hash: &Hash,
) -> ProofResult<u64> {
    let prefix = proof.prefix();
    let anchor = prefix
        .first()
        .ok_or_else(|| ProofError::invalid("empty prefix"))?;
    let anchor_hash = anchor.hash();
    if anchor_hash != *genesis_hash {
        return Err(ProofError::GenesisMismatch {
            expected: *genesis_hash,
            got: anchor_hash,
        });
    }

    let mut work = policy.difficulty(anchor.header.n_bits);

    // 1. Prefix: each block stands on its own, then each hop is legal.
    for block in prefix.iter().skip(1) {
        verify_light_block(block, policy)?;
    }
    for pair in prefix.windows(2) {
        let (earlier, later) = (&pair[0], &pair[1]);
        if !later.is_interlink_successor_of(earlier) {
            return Err(ProofError::invalid(format!(
                "prefix block at height {} does not reference height {}",
                later.height(),
                earlier.height()
            )));
        }
        work = work.saturating_add(hop_credit(earlier, later, policy));
    }

    // 2. Suffix: parent-linked run attached to the prefix head.
    let mut previous = match prefix.last() {
        Some(block) => &block.header,
        None => &anchor.header,
    };
    for header in proof.suffix() {
        verify_header(header, policy)?;
        if !header.is_immediate_successor_of(previous) {
            return Err(ProofError::invalid(format!(
                "suffix header at height {} does not extend height {}",
                header.height, previous.height
            )));
        }
        work = work.saturating_add(policy.difficulty(header.n_bits));
        previous = header;
    }

    debug!(
        head_height = previous.height,
        work,
        prefix = prefix.len(),
        suffix = proof.suffix().len(),
        "Verified chain proof"
    );
    Ok(work)
}

/// Work a prefix hop from `earlier` to `later` may claim.
pub(crate) fn hop_credit(earlier: &Block, later: &Block, policy: &ConsensusPolicy) -> u64 {
    let landing = policy.difficulty(later.header.n_bits);
    if later.header.prev_hash == earlier.hash() {
        return landing;
    }
    let span = u64::from(later.height().saturating_sub(earlier.height()));
    span.saturating_mul(landing)
        .min(superblock_work(earlier, policy))
}

/// Work proven by a block's superblock level: `2^level * difficulty`.
pub(crate) fn superblock_work(block: &Block, policy: &ConsensusPolicy) -> u64 {
    let weight = 1u64
        .checked_shl(block.superblock_level())
        .unwrap_or(u64::MAX);
    policy
        .difficulty(block.header.n_bits)
        .saturating_mul(weight)
}

fn verify_header(header: &Header, policy: &ConsensusPolicy) -> ProofResult<()> {
    if !header.n_bits.is_valid(policy.block_target_max) {
        return Err(ProofError::invalid(format!(
            "target {} out of range at height {}",
            header.n_bits, header.height
        )));
    }
    if !header.verify_proof_of_work() {
        return Err(ProofError::invalid(format!(
            "proof of work fails at height {}",
            header.height
        )));
    }
    Ok(())
}

fn verify_light_block(block: &Block, policy: &ConsensusPolicy) -> ProofResult<()> {
    verify_header(&block.header, policy)?;
    if block.interlink.hash(&block.header.prev_hash) != block.header.interlink_hash {
        return Err(ProofError::invalid(format!(
            "interlink commitment mismatch at height {}",
            block.height()
        )));
    }
    Ok(())
}

impl ChainProof {
    /// Verify against the local genesis, see [`verify_proof`].
    pub fn verify(&self, policy: &ConsensusPolicy, genesis_hash: &Hash) -> ProofResult<u64> {
        verify_proof(self, policy, genesis_hash)
    }
}
