//! Agent and mempool configuration.

use std::time::Duration;

use kc_05_wire_protocol::{Services, Subscription};
use serde::{Deserialize, Serialize};

use crate::domain::{MAX_SYNC_ATTEMPTS, REQUEST_TIMEOUT};

/// How much of the chain this node keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Download and apply every block
    #[default]
    Full,
    /// Check a chain proof before downloading anything
    Light,
}

impl SyncMode {
    /// Service flags advertised in `Version`.
    pub fn services(self) -> Services {
        match self {
            Self::Full => Services::FULL,
            Self::Light => Services::LIGHT,
        }
    }
}

/// Per-connection agent settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub sync_mode: SyncMode,
    /// Sent in `Version`, printable ASCII
    pub user_agent: Option<String>,
    /// Seconds allowed for `Version` + `VerAck`
    pub handshake_timeout_secs: u64,
    /// Seconds a peer may take to answer `GetBlocks`, `GetData` or a ping
    pub request_timeout_secs: u64,
    /// Seconds between pings once established
    pub ping_interval_secs: u64,
    /// Milliseconds between timer checks
    pub tick_interval_millis: u64,
    /// Seconds a misbehaving address stays banned
    pub ban_duration_secs: u64,
    /// Malformed messages tolerated before a ban
    pub max_strikes: u32,
    /// Empty sync rounds before giving up on catching up
    pub max_sync_attempts: u32,
    /// Hashes `GetBlocks` asks for per round
    pub max_inv_size: u16,
    /// Per-peer memory of inventory the peer already has
    pub known_inventory_capacity: usize,
    /// Filter sent to the peer after the handshake
    #[serde(skip)]
    pub subscription: Subscription,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::Full,
            user_agent: Some(format!("kestrel/{}", env!("CARGO_PKG_VERSION"))),
            handshake_timeout_secs: 10,
            request_timeout_secs: REQUEST_TIMEOUT.as_secs(),
            ping_interval_secs: 60,
            tick_interval_millis: 1_000,
            ban_duration_secs: 600,
            max_strikes: 3,
            max_sync_attempts: MAX_SYNC_ATTEMPTS,
            max_inv_size: 500,
            known_inventory_capacity: 4_096,
            subscription: Subscription::Any,
        }
    }
}

impl AgentConfig {
    /// Short timers and small caches.
    pub fn for_testing() -> Self {
        Self {
            user_agent: Some("kestrel/test".into()),
            handshake_timeout_secs: 2,
            request_timeout_secs: 2,
            ping_interval_secs: 30,
            tick_interval_millis: 100,
            ban_duration_secs: 60,
            max_sync_attempts: 3,
            known_inventory_capacity: 64,
            ..Self::default()
        }
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_millis.max(1))
    }
}

/// Admission limits for [`InMemoryMempool`](crate::InMemoryMempool).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    pub max_transactions: usize,
    /// Lowest absolute fee accepted
    pub min_fee: u64,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
            min_fee: 0,
        }
    }
}

impl MempoolConfig {
    pub fn for_testing() -> Self {
        Self {
            max_transactions: 16,
            min_fee: 0,
        }
    }
}
