//! # Domain Layer
//!
//! Connection states, penalties, sync bookkeeping and the shared ban list.

pub mod ban_list;
pub mod errors;
pub mod known_inventory;
pub mod penalty;
pub mod state;
pub mod sync;

use std::time::Duration;

pub use ban_list::{BanEntry, BanList};
pub use errors::{AgentError, AgentResult, ChannelError, MempoolError};
pub use known_inventory::KnownInventory;
pub use penalty::{penalty_for, Penalty};
pub use state::{AgentState, CloseReason, PeerAddress};
pub use sync::{RoundOutcome, SyncTracker};

/// Empty sync rounds before an agent stops trying to catch up.
pub const MAX_SYNC_ATTEMPTS: u32 = 10;

/// How long a peer may take to answer a request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Hard cap on hashes returned for one `GetBlocks`.
pub const GETBLOCKS_VECTORS_MAX: usize = 500;
