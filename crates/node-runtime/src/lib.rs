//! # Kestrel-Chain Node Runtime
//!
//! Hosts the subsystems of one node and connects them.
//!
//! ## Modular Structure
//!
//! - `container/` - Node configuration and the explicit [`NodeContext`]
//! - `genesis/` - Genesis block derivation
//! - `registry/` - Relay handles of connected agents
//! - `wiring/` - Chain and mempool event routing to the agents
//! - `logging` - `tracing` subscriber bootstrap
//!
//! ## Flow
//!
//! ```text
//! peer channel ──→ ConsensusAgent ──push_block──→ Blockchain
//!                        ↑                            │
//!                        │                       HeadChanged
//!                        │                            ↓
//!                  AgentRegistry ←──relay──────── ChainRelay ──→ Mempool
//! ```

pub mod container;
pub mod genesis;
pub mod logging;
pub mod registry;
pub mod wiring;

pub use container::{
    ConfigError, LogConfig, NodeConfig, NodeContext, NodeError, NodeIdentity, LOG_FILTER_ENV,
};
pub use genesis::build_genesis;
pub use logging::init_logging;
pub use registry::{AgentRegistry, RegistrationId};
pub use wiring::{spawn_transaction_relay, ChainRelay};
