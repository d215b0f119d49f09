//! # Agent Registry
//!
//! Relay handles of the currently connected consensus agents.
//!
//! Several connections may share a peer address (for instance after a
//! reconnect), so entries are keyed by a per-registration id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use kc_06_consensus_agent::{AgentHandle, PeerAddress, PeerRelay};
use parking_lot::RwLock;
use tracing::debug;

/// Identifies one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

/// Live agent handles.
#[derive(Default)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<RegistrationId, AgentHandle>>,
    next_id: AtomicU64,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: AgentHandle) -> RegistrationId {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(peer = %handle.peer(), "Agent registered");
        self.agents.write().insert(id, handle);
        id
    }

    pub fn unregister(&self, id: RegistrationId) -> Option<AgentHandle> {
        let removed = self.agents.write().remove(&id);
        if let Some(handle) = &removed {
            debug!(peer = %handle.peer(), "Agent unregistered");
        }
        removed
    }

    /// Snapshot of every registered handle.
    pub fn handles(&self) -> Vec<AgentHandle> {
        self.agents.read().values().cloned().collect()
    }

    /// Handles connected to `peer`.
    pub fn find(&self, peer: &PeerAddress) -> Vec<AgentHandle> {
        self.agents
            .read()
            .values()
            .filter(|handle| handle.peer() == peer)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }

    /// Pass `relay` to every agent. Returns how many accepted it.
    pub fn for_each_relay(&self, relay: impl Fn(&dyn PeerRelay) -> bool) -> usize {
        self.handles()
            .iter()
            .filter(|handle| relay(*handle as &dyn PeerRelay))
            .count()
    }
}
