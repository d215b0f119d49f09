//! Bookkeeping for sync rounds.
//!
//! A round is one `GetBlocks` and the `GetData` for whatever unknown blocks
//! its `Inv` listed. It is complete once the `Inv` arrived and every
//! requested block was received or reported missing.

use std::collections::HashSet;
use std::time::Duration;

use kc_01_block_model::Block;
use shared_types::Hash;
use tokio::time::Instant;

/// What to do after a round completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Ask for more blocks
    Continue,
    /// Too many rounds without progress
    GiveUp,
}

#[derive(Debug, Default)]
pub struct SyncTracker {
    getblocks_deadline: Option<Instant>,
    /// Locators of the outstanding `GetBlocks`
    locators: HashSet<Hash>,
    /// Single-block `Inv`s that may be the reply, settled on arrival
    reply_candidates: HashSet<Hash>,
    pending: HashSet<Hash>,
    pending_deadline: Option<Instant>,
    /// Blocks that moved the main chain this round
    extending: u32,
    /// Consecutive rounds without an extending block
    failed_rounds: u32,
    /// Last fork block received while syncing
    fork_head: Option<Hash>,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `GetBlocks` went out.
    pub fn getblocks_sent(&mut self, locators: &[Hash], now: Instant, timeout: Duration) {
        self.getblocks_deadline = Some(now + timeout);
        self.locators = locators.iter().copied().collect();
        self.reply_candidates.clear();
    }

    pub fn is_awaiting_inventory(&self) -> bool {
        self.getblocks_deadline.is_some()
    }

    /// An `Inv` listing `blocks` arrived; `only_blocks` is false if it
    /// listed anything else. Returns whether it answered our `GetBlocks`.
    ///
    /// A reply lists blocks only and relays announce one item per `Inv`, so
    /// an empty or multi-block `Inv` is the reply. A single block is held as
    /// a candidate until [`block_received`](Self::block_received) shows
    /// whether it builds on one of our locators.
    pub fn inventory_received(&mut self, blocks: &[Hash], only_blocks: bool) -> bool {
        if !self.is_awaiting_inventory() || !only_blocks {
            return false;
        }
        if let [single] = blocks {
            self.reply_candidates.insert(*single);
            return false;
        }
        self.clear_getblocks();
        true
    }

    /// A block arrived or was found locally. Returns whether it settled a
    /// single-block reply to our `GetBlocks`.
    pub fn block_received(&mut self, block: &Block) -> bool {
        if !self.reply_candidates.contains(&block.hash())
            || !self.locators.contains(block.prev_hash())
        {
            return false;
        }
        self.clear_getblocks();
        true
    }

    fn clear_getblocks(&mut self) {
        self.getblocks_deadline = None;
        self.locators.clear();
        self.reply_candidates.clear();
    }

    /// Blocks requested with `GetData`.
    pub fn blocks_requested(
        &mut self,
        hashes: impl IntoIterator<Item = Hash>,
        now: Instant,
        timeout: Duration,
    ) {
        self.pending.extend(hashes);
        if !self.pending.is_empty() {
            self.pending_deadline = Some(now + timeout);
        }
    }

    pub fn is_pending(&self, hash: &Hash) -> bool {
        self.pending.contains(hash)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// A requested block arrived, or the peer reported it missing.
    /// Returns whether it was pending. Each arrival extends the deadline.
    pub fn resolve(&mut self, hash: &Hash, now: Instant, timeout: Duration) -> bool {
        if !self.pending.remove(hash) {
            return false;
        }
        self.pending_deadline = if self.pending.is_empty() {
            None
        } else {
            Some(now + timeout)
        };
        true
    }

    /// A received block moved the main chain.
    pub fn note_extending(&mut self) {
        self.extending += 1;
        self.fork_head = None;
    }

    /// A received block landed on a fork. Returns `false` if it does not
    /// chain onto the previous fork block.
    pub fn note_fork(&mut self, block: &Block) -> bool {
        let chained = match self.fork_head {
            Some(previous) => *block.prev_hash() == previous,
            None => true,
        };
        self.fork_head = Some(block.hash());
        chained
    }

    /// No request of the round is outstanding.
    pub fn round_complete(&self) -> bool {
        self.getblocks_deadline.is_none() && self.pending.is_empty()
    }

    /// Close the round and count it.
    pub fn finish_round(&mut self, max_attempts: u32) -> RoundOutcome {
        if self.extending == 0 {
            self.failed_rounds += 1;
        } else {
            self.failed_rounds = 0;
        }
        self.extending = 0;
        if self.failed_rounds >= max_attempts {
            RoundOutcome::GiveUp
        } else {
            RoundOutcome::Continue
        }
    }

    pub fn failed_rounds(&self) -> u32 {
        self.failed_rounds
    }

    /// Name of the request whose deadline has passed.
    pub fn expired(&self, now: Instant) -> Option<&'static str> {
        if self.getblocks_deadline.is_some_and(|deadline| now >= deadline) {
            return Some("getblocks");
        }
        if self.pending_deadline.is_some_and(|deadline| now >= deadline) {
            return Some("getdata");
        }
        None
    }

    /// Forget everything, keeping nothing outstanding.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_01_block_model::test_utils::light_chain;
    use kc_01_block_model::ConsensusPolicy;

    const TIMEOUT: Duration = Duration::from_secs(10);

    #[test]
    fn test_round_completes_when_everything_arrived() {
        let now = Instant::now();
        let mut sync = SyncTracker::new();
        sync.getblocks_sent(&[Hash([7; 32])], now, TIMEOUT);
        assert!(!sync.round_complete());

        assert!(sync.inventory_received(&[Hash([1; 32]), Hash([2; 32])], true));
        sync.blocks_requested([Hash([1; 32]), Hash([2; 32])], now, TIMEOUT);
        assert!(!sync.round_complete());

        assert!(sync.resolve(&Hash([1; 32]), now, TIMEOUT));
        assert!(!sync.resolve(&Hash([9; 32]), now, TIMEOUT));
        assert!(sync.resolve(&Hash([2; 32]), now, TIMEOUT));
        assert!(sync.round_complete());
    }

    #[test]
    fn test_unsolicited_inventory() {
        let mut sync = SyncTracker::new();
        assert!(!sync.inventory_received(&[], true));
    }

    #[test]
    fn test_relay_announcement_keeps_getblocks_outstanding() {
        let policy = ConsensusPolicy::for_testing();
        let chain = light_chain(&policy, 6);
        let now = Instant::now();
        let mut sync = SyncTracker::new();
        sync.getblocks_sent(&[chain[2].hash(), chain[0].hash()], now, TIMEOUT);

        // Relayed block far ahead of our locators.
        assert!(!sync.inventory_received(&[chain[5].hash()], true));
        assert!(!sync.block_received(&chain[5]));
        assert!(!sync.inventory_received(&[Hash([4; 32])], false));
        assert!(sync.is_awaiting_inventory());
        assert_eq!(sync.expired(now + TIMEOUT), Some("getblocks"));
    }

    #[test]
    fn test_single_block_reply_settles_on_arrival() {
        let policy = ConsensusPolicy::for_testing();
        let chain = light_chain(&policy, 4);
        let now = Instant::now();
        let mut sync = SyncTracker::new();
        sync.getblocks_sent(&[chain[2].hash(), chain[0].hash()], now, TIMEOUT);

        assert!(!sync.inventory_received(&[chain[3].hash()], true));
        assert!(sync.is_awaiting_inventory());
        assert!(sync.block_received(&chain[3]));
        assert!(!sync.is_awaiting_inventory());
        assert!(sync.round_complete());
    }

    #[test]
    fn test_empty_inventory_answers_getblocks() {
        let mut sync = SyncTracker::new();
        sync.getblocks_sent(&[Hash([7; 32])], Instant::now(), TIMEOUT);
        assert!(sync.inventory_received(&[], true));
        assert!(sync.round_complete());
    }

    #[test]
    fn test_gives_up_after_empty_rounds() {
        let mut sync = SyncTracker::new();
        assert_eq!(sync.finish_round(3), RoundOutcome::Continue);
        assert_eq!(sync.finish_round(3), RoundOutcome::Continue);
        sync.note_extending();
        assert_eq!(sync.finish_round(3), RoundOutcome::Continue);
        assert_eq!(sync.failed_rounds(), 0);
        assert_eq!(sync.finish_round(3), RoundOutcome::Continue);
        assert_eq!(sync.finish_round(3), RoundOutcome::Continue);
        assert_eq!(sync.finish_round(3), RoundOutcome::GiveUp);
    }

    #[test]
    fn test_deadlines() {
        let now = Instant::now();
        let mut sync = SyncTracker::new();
        sync.getblocks_sent(&[Hash([7; 32])], now, TIMEOUT);
        assert_eq!(sync.expired(now), None);
        assert_eq!(sync.expired(now + TIMEOUT), Some("getblocks"));

        sync.inventory_received(&[], true);
        sync.blocks_requested([Hash([1; 32])], now, TIMEOUT);
        assert_eq!(sync.expired(now + TIMEOUT), Some("getdata"));
        sync.resolve(&Hash([1; 32]), now, TIMEOUT);
        assert_eq!(sync.expired(now + TIMEOUT * 2), None);
    }

    #[test]
    fn test_fork_blocks_must_chain() {
        let policy = ConsensusPolicy::for_testing();
        let chain = light_chain(&policy, 4);
        let mut sync = SyncTracker::new();
        assert!(sync.note_fork(&chain[1]));
        assert!(sync.note_fork(&chain[2]));
        assert!(!sync.note_fork(&chain[1]));

        sync.note_extending();
        assert!(sync.note_fork(&chain[3]));
    }
}
