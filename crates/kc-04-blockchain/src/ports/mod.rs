//! # Ports
//!
//! - [`inbound`]: the API agents and hosts drive the chain through
//! - [`outbound`]: the account tree and event listeners the chain drives

pub mod inbound;
pub mod outbound;

pub use inbound::BlockchainApi;
pub use outbound::{AccountTree, ChainListener};
