//! # Proof Construction
//!
//! Walk back from the head collecting `suffix_length` headers, then keep
//! walking through interlinks. Each hop takes the farthest interlink entry
//! whose superblock level covers the blocks it skips, falling back to the
//! parent, so the verifier credits every hop in full.

use kc_01_block_model::{Block, ConsensusPolicy};
use tracing::debug;

use super::verify::superblock_work;
use crate::domain::{ChainProof, ProofError, ProofResult};
use crate::ports::BlockLookup;

/// Build a proof for the chain ending at `head`.
///
/// # Errors
/// - `MissingBlock` if an ancestor is not in `lookup`
/// - `TooLarge` if the prefix outgrows the wire bound
pub fn build_proof<L: BlockLookup + ?Sized>(
    head: &Block,
    suffix_length: usize,
    policy: &ConsensusPolicy,
    lookup: &L,
) -> ProofResult<ChainProof> {
    let mut suffix = Vec::with_capacity(suffix_length);
    let mut cursor = head.clone();
    while suffix.len() < suffix_length && cursor.height() > 1 {
        let parent_hash = cursor.header.prev_hash;
        suffix.push(cursor.header.clone());
        cursor = lookup
            .block_by_hash(&parent_hash)
            .ok_or(ProofError::MissingBlock(parent_hash))?;
    }
    suffix.reverse();

    let mut prefix = vec![cursor.to_light()];
    while cursor.height() > 1 {
        let next = farthest_covered_hop(&cursor, policy, lookup)?;
        prefix.push(next.to_light());
        cursor = next;
    }
    prefix.reverse();

    debug!(
        head = %head.hash(),
        prefix = prefix.len(),
        suffix = suffix.len(),
        "Built chain proof"
    );
    ChainProof::new(prefix, suffix)
}

/// Ancestor of `cursor` the next prefix hop lands on.
fn farthest_covered_hop<L: BlockLookup + ?Sized>(
    cursor: &Block,
    policy: &ConsensusPolicy,
    lookup: &L,
) -> ProofResult<Block> {
    let parent_hash = cursor.header.prev_hash;
    for hash in cursor.interlink.hashes().iter().rev() {
        if *hash == parent_hash {
            break;
        }
        let Some(candidate) = lookup.block_by_hash(hash) else {
            continue;
        };
        if candidate.height() >= cursor.height() {
            return Err(ProofError::invalid(format!(
                "interlink of block at height {} points forward",
                cursor.height()
            )));
        }
        let span = u64::from(cursor.height() - candidate.height());
        let skipped = span.saturating_mul(policy.difficulty(cursor.header.n_bits));
        if skipped <= superblock_work(&candidate, policy) {
            return Ok(candidate);
        }
    }
    lookup
        .block_by_hash(&parent_hash)
        .ok_or(ProofError::MissingBlock(parent_hash))
}

impl ChainProof {
    /// Build a proof for the chain ending at `head`, see [`build_proof`].
    pub fn build<L: BlockLookup + ?Sized>(
        head: &Block,
        suffix_length: usize,
        policy: &ConsensusPolicy,
        lookup: &L,
    ) -> ProofResult<Self> {
        build_proof(head, suffix_length, policy, lookup)
    }
}
