//! # Domain Layer
//!
//! The proof type and its errors.

pub mod errors;
pub mod proof;

pub use errors::{ProofError, ProofResult};
pub use proof::{ChainProof, PROOF_PREFIX_MAX, PROOF_SUFFIX_MAX};
