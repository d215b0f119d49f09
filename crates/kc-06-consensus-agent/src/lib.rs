//! # Kestrel Chain - Consensus Agent (Subsystem 06)
//!
//! **Bounded Context:** One peer connection, from handshake to relay
//!
//! ## State Machine
//!
//! ```text
//! CONNECTING ──Version sent──▶ HANDSHAKE ──Version + VerAck──▶ SYNCING ──caught up──▶ ESTABLISHED
//!      │                           │                             │                        │
//!      └───────────────────────────┴──────── timeout / ban / close ┴────────────────────────┴──▶ CLOSED
//! ```
//!
//! - **Handshake:** both sides send `Version` on connect. A matching
//!   challenge nonce means the node dialed itself. Genesis or version
//!   mismatch closes the connection.
//! - **Sync:** light nodes first ask a `FULL` peer for a chain proof and
//!   skip the download when the proof claims no more work than the local
//!   chain. Otherwise rounds of `GetBlocks` → `Inv` → `GetData` → `Block`
//!   run until the peer's head is known locally or
//!   [`AgentConfig::max_sync_attempts`] rounds in a row made no progress.
//! - **Established:** inventory is announced to the peer when its
//!   `Subscribe` filter matches and it is not known to have the object.
//!
//! ## Penalties
//!
//! | Kind | Action |
//! |------|--------|
//! | `CorruptMessage`, `UnknownMessageType`, `InvalidBlock` | close + ban |
//! | self-contradictory `InvalidProof` | close + ban |
//! | `MalformedInput`, `InvalidTransaction` | strike, ban at `max_strikes` |
//! | `HandshakeTimeout`, `SyncTimeout` | close, no ban |
//! | `Orphan` | none, ancestors are requested |
//!
//! ## Module Structure
//!
//! ```text
//! kc-06-consensus-agent/
//! ├── domain/     # states, close reasons, penalties, sync bookkeeping, ban list
//! ├── ports/      # PeerRelay (inbound), PeerChannel + Mempool (outbound)
//! ├── adapters/   # in-memory channel pair, in-memory mempool
//! ├── config.rs   # AgentConfig, MempoolConfig
//! └── service.rs  # ConsensusAgent run loop and AgentHandle
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryMempool, MemoryChannel};
pub use config::{AgentConfig, MempoolConfig, SyncMode};
pub use domain::{
    penalty_for, AgentError, AgentResult, AgentState, BanList, ChannelError, CloseReason,
    KnownInventory, MempoolError, PeerAddress, Penalty, SyncTracker, MAX_SYNC_ATTEMPTS,
    REQUEST_TIMEOUT,
};
pub use ports::{Mempool, PeerChannel, PeerRelay};
pub use service::{AgentHandle, ConsensusAgent};
