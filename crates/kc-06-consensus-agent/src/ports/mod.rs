//! # Ports
//!
//! - **Inbound:** [`PeerRelay`], how the host announces inventory to a peer
//! - **Outbound:** [`PeerChannel`] (transport) and [`Mempool`]

pub mod inbound;
pub mod outbound;

pub use inbound::PeerRelay;
pub use outbound::{Mempool, PeerChannel};
