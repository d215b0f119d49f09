//! Ports for chain proofs.

pub mod outbound;

pub use outbound::BlockLookup;
