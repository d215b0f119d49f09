//! # Adapters
//!
//! In-memory implementations of the outbound ports.

pub mod channel;
pub mod mempool;

pub use channel::MemoryChannel;
pub use mempool::InMemoryMempool;
