//! # Kestrel Chain - Blockchain (Subsystem 04)
//!
//! **Bounded Context:** Canonical chain selection
//!
//! ## Purpose
//!
//! Owns the main chain and every tracked fork, decides which chain is
//! canonical by total work, and drives the account tree forward and
//! backward when the canonical chain changes.
//!
//! ## Fork Choice
//!
//! | Candidate vs main | Outcome |
//! |-------------------|---------|
//! | extends the main head | `Extended`: apply the block |
//! | more total work | `Rebranched`: revert to the fork point, apply the fork |
//! | equal or less work | `Forked`: store, no account changes |
//!
//! Equal work never reorganizes: the chain seen first keeps the head.
//!
//! ## Concurrency
//!
//! Chain-mutating calls queue on one FIFO async mutex, so at most one push,
//! apply or revert runs at a time and later calls always observe a fully
//! applied or fully reverted state. The current head is mirrored into a
//! read snapshot that never waits on the queue.
//!
//! ## Events
//!
//! [`ChainEvent::HeadChanged`] fires once per extension or adopted reorg;
//! [`ChainEvent::BlockRejected`] fires for blocks that fail validation.
//! Listeners run synchronously, in registration order, after the change is
//! committed.
//!
//! ## Module Structure
//!
//! ```text
//! kc-04-blockchain/
//! ├── domain/     # errors, events, push results, locators
//! ├── ports/      # BlockchainApi (inbound), AccountTree + ChainListener (outbound)
//! ├── adapters/   # in-memory account tree, channel listener
//! ├── service.rs  # Blockchain
//! └── producer.rs # block templates on top of the head
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod producer;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::{ChannelListener, InMemoryAccountTree, RecordingListener};
pub use config::BlockchainConfig;
pub use domain::{
    locator_heights, Account, AccountsError, BlockchainError, BlockchainResult, ChainEvent,
    Direction, InvalidReason, PushResult, LOCATORS_MAX_COUNT,
};
pub use ports::{AccountTree, BlockchainApi, ChainListener};
pub use producer::{solve, BlockProducer};
pub use service::Blockchain;
