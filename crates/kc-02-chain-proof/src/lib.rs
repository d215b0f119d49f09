//! # KC-02 Chain Proof
//!
//! Compact, non-interactive proofs of cumulative work (NiPoPoW-style).
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (domain / algorithms / ports)
//!
//! ## Purpose
//!
//! A light client needs to know whether a peer's chain carries more work
//! than its own without downloading every header. A [`ChainProof`] ships:
//!
//! - a sparse **prefix** of light blocks anchored at genesis, each linked to
//!   the next through an interlink entry the older block qualifies for
//! - a dense **suffix** of the most recent headers, linked by `prev_hash`
//!
//! ```text
//! genesis ──▶ L3 ──▶ L3 ──▶ L1 ──▶ L0 ─▶ ║ h ─▶ h ─▶ h ─▶ head
//!            (prefix: superblock hops)    ║ (suffix: every header)
//! ```
//!
//! ## Verification
//!
//! | Check | Failure |
//! |-------|---------|
//! | prefix starts at the local genesis | `GenesisMismatch` |
//! | every block meets its target and interlink commitment | `InvalidProof` |
//! | prefix hops follow interlink or parent links | `InvalidProof` |
//! | suffix is a parent-linked run attached to the prefix | `InvalidProof` |
//!
//! A verified proof reports its implied total work. The proof alone never
//! makes a chain authoritative for a full node: bodies must still be
//! replayed through the blockchain.
//!
//! ## Module Structure
//!
//! ```text
//! kc-02-chain-proof/
//! ├── domain/        # ChainProof type, wire encoding, errors
//! ├── algorithms/    # build (prove) and verify
//! └── ports/         # BlockLookup (outbound)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod domain;
pub mod ports;

pub use algorithms::{build_proof, verify_proof};
pub use domain::{ChainProof, ProofError, ProofResult, PROOF_PREFIX_MAX, PROOF_SUFFIX_MAX};
pub use ports::BlockLookup;
