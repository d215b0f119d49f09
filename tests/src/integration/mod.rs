//! # Integration Scenarios
//!
//! Every scenario runs complete nodes ([`node_runtime::NodeContext`]) wired
//! together with in-process channels, so each message still goes through
//! framing, parsing and the full agent state machine.

#[cfg(test)]
mod network;

pub mod light_sync;
pub mod misbehaviour;
pub mod relay;
pub mod sync;
