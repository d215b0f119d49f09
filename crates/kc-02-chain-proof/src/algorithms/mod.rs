//! # Algorithms
//!
//! Proof construction and verification.

pub mod build;
pub mod verify;

pub use build::build_proof;
pub use verify::verify_proof;
