//! Addresses banned for misbehaviour, shared by every agent.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::{ErrorKind, SystemTimeSource, TimeSource};
use tracing::{debug, warn};

use super::state::PeerAddress;

/// One ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanEntry {
    /// Unix seconds the ban lifts at
    pub banned_until: u64,
    pub reason: ErrorKind,
}

/// Expiry-based ban list.
pub struct BanList {
    entries: RwLock<HashMap<PeerAddress, BanEntry>>,
    time_source: Box<dyn TimeSource>,
}

impl Default for BanList {
    fn default() -> Self {
        Self::new()
    }
}

impl BanList {
    pub fn new() -> Self {
        Self::with_time_source(Box::new(SystemTimeSource))
    }

    pub fn with_time_source(time_source: Box<dyn TimeSource>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            time_source,
        }
    }

    /// Ban `peer` for `duration_secs`. An existing longer ban is kept.
    ///
    /// Expired entries are swept on every ban, so the map stays bounded by
    /// the bans active at once.
    pub fn ban(&self, peer: &PeerAddress, duration_secs: u64, reason: ErrorKind) {
        let now = self.time_source.now();
        let banned_until = now.saturating_add(duration_secs);
        let mut entries = self.entries.write();
        retain_active(&mut entries, now);
        let entry = entries.entry(peer.clone()).or_insert(BanEntry {
            banned_until,
            reason,
        });
        if entry.banned_until < banned_until {
            *entry = BanEntry {
                banned_until,
                reason,
            };
        }
        warn!(%peer, ?reason, banned_until, "Peer banned");
    }

    pub fn is_banned(&self, peer: &PeerAddress) -> bool {
        let now = self.time_source.now();
        self.entries
            .read()
            .get(peer)
            .is_some_and(|entry| entry.banned_until > now)
    }

    /// Active ban of `peer`, if any.
    pub fn entry(&self, peer: &PeerAddress) -> Option<BanEntry> {
        let now = self.time_source.now();
        self.entries
            .read()
            .get(peer)
            .filter(|entry| entry.banned_until > now)
            .cloned()
    }

    pub fn unban(&self, peer: &PeerAddress) -> bool {
        self.entries.write().remove(peer).is_some()
    }

    /// Drop expired entries. Returns how many were dropped.
    pub fn gc_expired(&self) -> usize {
        retain_active(&mut self.entries.write(), self.time_source.now())
    }

    /// Number of active bans.
    pub fn count(&self) -> usize {
        let now = self.time_source.now();
        self.entries
            .read()
            .values()
            .filter(|entry| entry.banned_until > now)
            .count()
    }
}

fn retain_active(entries: &mut HashMap<PeerAddress, BanEntry>, now: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| entry.banned_until > now);
    let dropped = before - entries.len();
    if dropped > 0 {
        debug!(dropped, "Expired bans dropped");
    }
    dropped
}
