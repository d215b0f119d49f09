//! # Kestrel Chain - Block Model (Subsystem 01)
//!
//! **Bounded Context:** Blocks, headers and proof-of-work arithmetic
//!
//! ## Purpose
//!
//! Immutable value types exchanged between every other subsystem:
//! - [`Header`]: the hashed, mined part of a block
//! - [`Interlink`]: superblock back-references that make sparse chain proofs possible
//! - [`Body`]: miner address, extra data and the ordered transaction list
//! - [`Block`]: header + interlink + optional body ("light" blocks carry no body)
//!
//! ## Proof of Work
//!
//! Targets travel in compact (`nBits`) form, see [`CompactTarget`]. A block's
//! difficulty is `block_target_max / target`, and the chain with the highest
//! summed difficulty wins fork choice.
//!
//! ```text
//! level(block) = floor(log2(target / hash))
//! ```
//!
//! A block of level `k` appears `k + 1` times at the front of its
//! successor's interlink.
//!
//! ## Critical Invariants
//!
//! 1. `hash(header) <= target(header.n_bits)`
//! 2. `header.interlink_hash == interlink.hash(header.prev_hash)`
//! 3. `header.body_hash == body.hash()` whenever a body is present
//! 4. `serialize(block).len() <= block_size_max`

pub mod config;
pub mod domain;
pub mod error;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::ConsensusPolicy;
pub use domain::block::Block;
pub use domain::body::Body;
pub use domain::genesis::{create_genesis_block, GenesisConfig};
pub use domain::header::{Header, HEADER_SIZE, SUPPORTED_VERSIONS};
pub use domain::interlink::Interlink;
pub use domain::merkle::{merkle_root, OddNodePolicy, TRANSACTION_ROOT_POLICY};
pub use domain::retarget::{next_target, RetargetWindow};
pub use domain::target::{meets_target, CompactTarget, U256};
pub use domain::transaction::Transaction;
pub use error::{BlockError, BlockResult};
