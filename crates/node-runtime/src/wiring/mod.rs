//! # Wiring
//!
//! Event routing between the chain, the mempool and the connected agents.

pub mod event_routing;

pub use event_routing::{spawn_transaction_relay, ChainRelay};
