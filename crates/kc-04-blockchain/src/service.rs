//! # Blockchain Service
//!
//! Main chain, tracked fork tips and the account tree behind one FIFO
//! queue. Every mutation runs to completion, including rollback, before the
//! next queued call starts.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use kc_01_block_model::{
    next_target, Block, Body, CompactTarget, ConsensusPolicy, Header, RetargetWindow,
};
use kc_02_chain_proof::{build_proof, BlockLookup, ChainProof};
use kc_03_chain_store::{BlockchainStore, Chain, InMemoryKVStore, KeyValueStore};
use parking_lot::RwLock;
use shared_types::{Address, Hash, SystemTimeSource, TimeSource};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::adapters::InMemoryAccountTree;
use crate::config::BlockchainConfig;
use crate::domain::{
    locator_heights, Account, BlockchainError, BlockchainResult, ChainEvent, Direction,
    InvalidReason, PushResult,
};
use crate::ports::inbound::BlockchainApi;
use crate::ports::outbound::{AccountTree, ChainListener};

/// Header version produced by [`Blockchain::block_template`].
const BLOCK_VERSION: u16 = 1;

/// State guarded by the queue.
struct ChainState<A, S: KeyValueStore> {
    store: BlockchainStore<S>,
    accounts: A,
    main: Chain,
    /// Fork tip hash -> total work
    forks: HashMap<Hash, u64>,
}

/// Head mirror readable without joining the queue.
struct HeadSnapshot {
    head: Block,
    total_work: u64,
}

impl HeadSnapshot {
    fn of(chain: &Chain) -> Self {
        Self {
            head: chain.head.clone(),
            total_work: chain.total_work,
        }
    }
}

/// The blockchain: fork choice by total work over stored chains.
pub struct Blockchain<A = InMemoryAccountTree, S = InMemoryKVStore>
where
    A: AccountTree,
    S: KeyValueStore,
{
    config: BlockchainConfig,
    genesis_hash: Hash,
    /// FIFO single-flight queue for every chain mutation
    state: Mutex<ChainState<A, S>>,
    snapshot: RwLock<HeadSnapshot>,
    listeners: RwLock<Vec<Arc<dyn ChainListener>>>,
    time_source: Box<dyn TimeSource>,
}

impl Blockchain<InMemoryAccountTree, InMemoryKVStore> {
    /// Volatile chain with an empty account tree.
    pub fn in_memory(config: BlockchainConfig, genesis: Block) -> BlockchainResult<Self> {
        let accounts = InMemoryAccountTree::new(config.policy.block_reward);
        Self::new(config, genesis, accounts, BlockchainStore::in_memory())
    }
}

impl<A, S> Blockchain<A, S>
where
    A: AccountTree,
    S: KeyValueStore,
{
    /// Open a chain on `store`.
    ///
    /// An empty store is seeded with `genesis`. A store that already holds
    /// `genesis` resumes from its heaviest main chain record; `accounts` must
    /// then be the state at that head.
    pub fn new(
        config: BlockchainConfig,
        genesis: Block,
        accounts: A,
        mut store: BlockchainStore<S>,
    ) -> BlockchainResult<Self> {
        let genesis_hash = genesis.hash();
        if genesis.height() != 1 {
            return Err(BlockchainError::corrupted(format!(
                "genesis block at height {}",
                genesis.height()
            )));
        }

        let main = if store.contains(&genesis_hash)? {
            let max = store
                .get_max()?
                .ok_or_else(|| BlockchainError::corrupted("store holds no chain"))?;
            if !max.on_main_chain {
                return Err(BlockchainError::corrupted(
                    "heaviest stored chain is not the main chain",
                ));
            }
            if max.height() > 1 && accounts.root() != max.head.header.accounts_hash {
                return Err(BlockchainError::corrupted(
                    "account tree does not match the stored head",
                ));
            }
            info!(head = %max.hash(), height = max.height(), "Resuming stored chain");
            max
        } else {
            let work = config.policy.difficulty(genesis.header.n_bits);
            let chain = Chain::new(genesis, work, true);
            store.put(&chain)?;
            store.set_main_at(1, &genesis_hash)?;
            chain
        };

        Ok(Self {
            snapshot: RwLock::new(HeadSnapshot::of(&main)),
            state: Mutex::new(ChainState {
                store,
                accounts,
                main,
                forks: HashMap::new(),
            }),
            config,
            genesis_hash,
            listeners: RwLock::new(Vec::new()),
            time_source: Box::new(SystemTimeSource),
        })
    }

    /// Create with custom time source (for testing).
    pub fn with_time_source(mut self, time_source: Box<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    pub fn policy(&self) -> &ConsensusPolicy {
        &self.config.policy
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    pub fn head(&self) -> Block {
        self.snapshot.read().head.clone()
    }

    pub fn head_hash(&self) -> Hash {
        self.snapshot.read().head.hash()
    }

    pub fn height(&self) -> u32 {
        self.snapshot.read().head.height()
    }

    pub fn total_work(&self) -> u64 {
        self.snapshot.read().total_work
    }

    /// Register a listener. Delivery follows registration order.
    pub fn subscribe(&self, listener: Arc<dyn ChainListener>) {
        self.listeners.write().push(listener);
    }

    fn notify(&self, event: &ChainEvent) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener.on_event(event);
        }
    }

    fn publish_head(&self, chain: &Chain) {
        *self.snapshot.write() = HeadSnapshot::of(chain);
    }

    fn reject(&self, hash: Hash, reason: InvalidReason) -> BlockchainError {
        warn!(%hash, %reason, "Block rejected");
        self.notify(&ChainEvent::BlockRejected {
            hash,
            reason: reason.clone(),
        });
        BlockchainError::InvalidBlock { hash, reason }
    }

    // =========================================================================
    // PUSH
    // =========================================================================

    /// Validate `block` and attach it to the chain it extends.
    ///
    /// # Errors
    /// - `InvalidBlock`: consensus rule broken; the block is not stored
    /// - `Orphan`: parent unknown; the caller should fetch ancestors
    #[instrument(skip_all, fields(hash = %block.hash(), height = block.height()))]
    pub async fn push_block(&self, block: Block) -> BlockchainResult<PushResult> {
        let mut state = self.state.lock().await;
        self.push_locked(&mut state, block)
    }

    fn push_locked(
        &self,
        state: &mut ChainState<A, S>,
        block: Block,
    ) -> BlockchainResult<PushResult> {
        let hash = block.hash();
        if state.store.contains(&hash)? {
            debug!(%hash, "Block already known");
            return Ok(PushResult::Known);
        }

        let policy = &self.config.policy;
        if let Err(err) = block.verify(policy, self.time_source.now()) {
            return Err(self.reject(hash, err.into()));
        }
        if block.is_light() {
            return Err(self.reject(hash, InvalidReason::MissingBody));
        }

        let parent_hash = *block.prev_hash();
        let Some(parent) = state.store.get(&parent_hash)? else {
            debug!(%hash, parent = %parent_hash, "Orphan block");
            return Err(BlockchainError::Orphan {
                hash,
                parent: parent_hash,
            });
        };

        if !block.is_immediate_successor_of(&parent.head) {
            return Err(self.reject(hash, InvalidReason::NotSuccessor));
        }
        let expected = target_after(policy, &state.store, &parent)?;
        if block.header.n_bits != expected {
            return Err(self.reject(
                hash,
                InvalidReason::WrongTarget {
                    expected,
                    got: block.header.n_bits,
                },
            ));
        }

        let difficulty = policy.difficulty(block.header.n_bits);
        let candidate = parent.extend(block, difficulty);

        if parent_hash == state.main.hash() {
            self.extend(state, candidate)
        } else if candidate.total_work > state.main.total_work {
            self.rebranch(state, candidate)
        } else {
            self.fork(state, candidate)
        }
    }

    fn extend(
        &self,
        state: &mut ChainState<A, S>,
        mut candidate: Chain,
    ) -> BlockchainResult<PushResult> {
        let hash = candidate.hash();
        let root = match state.accounts.apply(&candidate.head) {
            Ok(root) => root,
            Err(err) => return Err(self.reject(hash, err.into())),
        };
        let expected = candidate.head.header.accounts_hash;
        if root != expected {
            state.accounts.revert(&candidate.head).map_err(|err| {
                BlockchainError::corrupted(format!("revert of {hash} failed: {err}"))
            })?;
            return Err(self.reject(
                hash,
                InvalidReason::AccountsHashMismatch {
                    expected,
                    actual: root,
                },
            ));
        }

        candidate.on_main_chain = true;
        let stored = state
            .store
            .put(&candidate)
            .and_then(|()| state.store.set_main_at(candidate.height(), &hash));
        if let Err(err) = stored {
            state.accounts.revert(&candidate.head).map_err(|revert_err| {
                BlockchainError::corrupted(format!(
                    "revert of {hash} after store failure ({err}) failed: {revert_err}"
                ))
            })?;
            return Err(err.into());
        }

        state.main = candidate.clone();
        self.publish_head(&candidate);
        debug!(
            %hash,
            height = candidate.height(),
            work = candidate.total_work,
            "Extended main chain"
        );
        self.notify(&ChainEvent::HeadChanged {
            head: candidate.head.clone(),
            applied: vec![candidate.head],
            reverted: Vec::new(),
        });
        Ok(PushResult::Extended)
    }

    fn fork(
        &self,
        state: &mut ChainState<A, S>,
        candidate: Chain,
    ) -> BlockchainResult<PushResult> {
        let hash = candidate.hash();
        state.store.put(&candidate)?;
        state.forks.remove(candidate.head.prev_hash());
        state.forks.insert(hash, candidate.total_work);
        debug!(
            %hash,
            height = candidate.height(),
            work = candidate.total_work,
            main_work = state.main.total_work,
            "Stored fork block"
        );
        self.evict_forks(state)?;
        Ok(PushResult::Forked)
    }

    fn rebranch(
        &self,
        state: &mut ChainState<A, S>,
        candidate: Chain,
    ) -> BlockchainResult<PushResult> {
        let new_hash = candidate.hash();

        // Fork side, newest first, down to (excluding) the fork point.
        let mut fork_side = vec![candidate];
        let mut cursor = load(&state.store, fork_side[0].head.prev_hash())?;
        while !cursor.on_main_chain {
            let prev = *cursor.head.prev_hash();
            fork_side.push(cursor);
            cursor = load(&state.store, &prev)?;
        }
        let fork_point = cursor.hash();

        // Main side, newest first, down to (excluding) the fork point.
        let mut main_side = Vec::new();
        let mut cursor = state.main.clone();
        while cursor.hash() != fork_point {
            let prev = *cursor.head.prev_hash();
            main_side.push(cursor);
            cursor = load(&state.store, &prev)?;
        }

        for (index, chain) in main_side.iter().enumerate() {
            if let Err(err) = state.accounts.revert(&chain.head) {
                restore(&mut state.accounts, &[], &main_side[..index])?;
                return Err(BlockchainError::corrupted(format!(
                    "revert of {} failed: {err}",
                    chain.hash()
                )));
            }
        }

        let mut applied = 0;
        let mut failure = None;
        for (index, chain) in fork_side.iter().enumerate().rev() {
            match state.accounts.apply(&chain.head) {
                Ok(root) if root == chain.head.header.accounts_hash => applied += 1,
                Ok(root) => {
                    state.accounts.revert(&chain.head).map_err(|err| {
                        BlockchainError::corrupted(format!(
                            "revert of {} failed: {err}",
                            chain.hash()
                        ))
                    })?;
                    let reason = InvalidReason::AccountsHashMismatch {
                        expected: chain.head.header.accounts_hash,
                        actual: root,
                    };
                    failure = Some((index, reason));
                    break;
                }
                Err(err) => {
                    failure = Some((index, err.into()));
                    break;
                }
            }
        }

        if let Some((bad_index, reason)) = failure {
            let applied_side = &fork_side[fork_side.len() - applied..];
            restore(&mut state.accounts, applied_side, &main_side)?;
            let bad_hash = fork_side[bad_index].hash();
            self.discard_branch(state, &fork_side, bad_index)?;
            warn!(
                head = %new_hash,
                bad = %bad_hash,
                "Rebranch failed, main chain unchanged"
            );
            return Err(self.reject(bad_hash, reason));
        }

        for chain in &mut main_side {
            chain.on_main_chain = false;
        }
        for chain in &mut fork_side {
            chain.on_main_chain = true;
        }
        let updates: Vec<Chain> = main_side.iter().chain(fork_side.iter()).cloned().collect();
        state.store.put_all(&updates)?;

        let new_height = fork_side[0].height();
        for chain in &main_side {
            if chain.height() > new_height {
                state.store.remove_main_at(chain.height())?;
            }
        }
        for chain in &fork_side {
            state.store.set_main_at(chain.height(), &chain.hash())?;
        }

        let old_head = state.main.clone();
        state.forks.remove(fork_side[0].head.prev_hash());
        state.forks.insert(old_head.hash(), old_head.total_work);
        state.main = fork_side[0].clone();
        self.publish_head(&state.main);

        info!(
            old_head = %old_head.hash(),
            new_head = %new_hash,
            fork_point = %fork_point,
            reverted = main_side.len(),
            applied = fork_side.len(),
            work = state.main.total_work,
            "Rebranched to heavier chain"
        );

        self.evict_forks(state)?;
        self.notify(&ChainEvent::HeadChanged {
            head: state.main.head.clone(),
            applied: fork_side.into_iter().rev().map(|chain| chain.head).collect(),
            reverted: main_side.into_iter().map(|chain| chain.head).collect(),
        });
        Ok(PushResult::Rebranched)
    }

    /// Drop the invalid block at `bad_index` of a failed rebranch and every
    /// stored descendant of it.
    fn discard_branch(
        &self,
        state: &mut ChainState<A, S>,
        fork_side: &[Chain],
        bad_index: usize,
    ) -> BlockchainResult<()> {
        if bad_index == 0 {
            return Ok(());
        }
        for chain in &fork_side[1..=bad_index] {
            state.store.delete(&chain.hash())?;
        }
        state.forks.remove(fork_side[0].head.prev_hash());

        let tips: Vec<Hash> = state.forks.keys().copied().collect();
        for tip in tips {
            if branch_of(&state.store, &tip)?.is_some() {
                continue;
            }
            state.forks.remove(&tip);
            let mut cursor = tip;
            while let Some(chain) = state.store.get(&cursor)? {
                state.store.delete(&cursor)?;
                cursor = *chain.head.prev_hash();
            }
        }

        // The valid remainder of the branch becomes a tip again.
        if let Some(survivor) = fork_side.get(bad_index + 1) {
            let hash = survivor.hash();
            let mut covered = false;
            for tip in state.forks.keys() {
                if let Some(branch) = branch_of(&state.store, tip)? {
                    if branch.contains(&hash) {
                        covered = true;
                        break;
                    }
                }
            }
            if !covered {
                state.forks.insert(hash, survivor.total_work);
            }
        }
        Ok(())
    }

    /// Evict least-work fork tips until the budget holds.
    fn evict_forks(&self, state: &mut ChainState<A, S>) -> BlockchainResult<()> {
        while state.forks.len() > self.config.max_forks {
            let Some(tip) = state
                .forks
                .iter()
                .min_by_key(|(hash, work)| (**work, std::cmp::Reverse(**hash)))
                .map(|(hash, _)| *hash)
            else {
                break;
            };
            state.forks.remove(&tip);

            let mut shared = HashSet::new();
            for other in state.forks.keys() {
                if let Some(branch) = branch_of(&state.store, other)? {
                    shared.extend(branch);
                }
            }

            let mut removed = 0usize;
            let mut cursor = tip;
            while let Some(chain) = state.store.get(&cursor)? {
                if chain.on_main_chain || shared.contains(&cursor) {
                    break;
                }
                state.store.delete(&cursor)?;
                removed += 1;
                cursor = *chain.head.prev_hash();
            }
            debug!(%tip, removed, "Evicted fork");
        }
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Block by hash. Fork blocks only with `include_forks`.
    pub async fn get_block(
        &self,
        hash: &Hash,
        include_forks: bool,
    ) -> BlockchainResult<Option<Block>> {
        let state = self.state.lock().await;
        Ok(state
            .store
            .get(hash)?
            .filter(|chain| include_forks || chain.on_main_chain)
            .map(|chain| chain.head))
    }

    /// Main chain block at `height`.
    pub async fn get_block_at(&self, height: u32) -> BlockchainResult<Option<Block>> {
        let state = self.state.lock().await;
        match state.store.main_at(height)? {
            Some(hash) => Ok(state.store.get(&hash)?.map(|chain| chain.head)),
            None => Ok(None),
        }
    }

    /// Whether `hash` is stored on the main chain or a fork.
    pub async fn contains(&self, hash: &Hash) -> BlockchainResult<bool> {
        let state = self.state.lock().await;
        Ok(state.store.contains(hash)?)
    }

    /// Locator hashes of the main chain, head first, genesis last.
    pub async fn block_locators(&self) -> BlockchainResult<Vec<Hash>> {
        let state = self.state.lock().await;
        locator_heights(state.main.height())
            .into_iter()
            .map(|height| main_hash_at(&state.store, height))
            .collect()
    }

    /// Up to `count` main chain hashes next to the first locator found on
    /// the main chain, walking in `direction`. Without a known locator the
    /// walk starts at genesis.
    pub async fn blocks_after(
        &self,
        locators: &[Hash],
        count: usize,
        direction: Direction,
    ) -> BlockchainResult<Vec<Hash>> {
        let state = self.state.lock().await;
        let mut start = 1;
        for locator in locators {
            if let Some(chain) = state.store.get(locator)? {
                if chain.on_main_chain {
                    start = chain.height();
                    break;
                }
            }
        }

        let heights: Vec<u32> = match direction {
            Direction::Forward => (start.saturating_add(1)..=state.main.height())
                .take(count)
                .collect(),
            Direction::Backward => (1..start).rev().take(count).collect(),
        };
        heights
            .into_iter()
            .map(|height| main_hash_at(&state.store, height))
            .collect()
    }

    /// Target a child of `parent_hash` must carry, `None` for an unknown
    /// parent.
    pub async fn next_target(&self, parent_hash: &Hash) -> BlockchainResult<Option<CompactTarget>> {
        let state = self.state.lock().await;
        match state.store.get(parent_hash)? {
            Some(parent) => Ok(Some(target_after(
                &self.config.policy,
                &state.store,
                &parent,
            )?)),
            None => Ok(None),
        }
    }

    /// Proof of the current main chain.
    pub async fn chain_proof(&self) -> BlockchainResult<ChainProof> {
        let state = self.state.lock().await;
        let lookup = StoreLookup {
            store: &state.store,
        };
        Ok(build_proof(
            &state.main.head,
            self.config.policy.proof_suffix_length,
            &self.config.policy,
            &lookup,
        )?)
    }

    /// Hash and total work of the heaviest stored record.
    pub async fn max_work_chain(&self) -> BlockchainResult<Option<(Hash, u64)>> {
        let mut state = self.state.lock().await;
        Ok(state
            .store
            .get_max()?
            .map(|chain| (chain.hash(), chain.total_work)))
    }

    pub async fn account(&self, address: &Address) -> Account {
        self.state.lock().await.accounts.account(address)
    }

    pub async fn accounts_root(&self) -> Hash {
        self.state.lock().await.accounts.root()
    }

    /// Unmined block on top of the head carrying `body`.
    ///
    /// The timestamp is raised to one second past the head if needed.
    pub async fn block_template(&self, body: Body, timestamp: u32) -> BlockchainResult<Block> {
        let state = self.state.lock().await;
        let parent = &state.main;
        let n_bits = target_after(&self.config.policy, &state.store, parent)?;
        let accounts_hash = state.accounts.compute_state_root(&body)?;
        let interlink = parent.head.next_interlink();
        let prev_hash = parent.hash();

        let header = Header {
            version: BLOCK_VERSION,
            prev_hash,
            interlink_hash: interlink.hash(&prev_hash),
            body_hash: body.hash(),
            accounts_hash,
            n_bits,
            height: parent.height().saturating_add(1),
            timestamp: timestamp.max(parent.head.header.timestamp.saturating_add(1)),
            nonce: 0,
        };
        Ok(Block::new(header, interlink, Some(body)))
    }
}

/// Record for `hash`, which the chain structure guarantees exists.
fn load<S: KeyValueStore>(store: &BlockchainStore<S>, hash: &Hash) -> BlockchainResult<Chain> {
    store
        .get(hash)?
        .ok_or_else(|| BlockchainError::corrupted(format!("missing chain record {hash}")))
}

fn main_hash_at<S: KeyValueStore>(
    store: &BlockchainStore<S>,
    height: u32,
) -> BlockchainResult<Hash> {
    store
        .main_at(height)?
        .ok_or_else(|| BlockchainError::corrupted(format!("no main chain block at height {height}")))
}

/// Ancestor of `from` at `height`, jumping through the height index once
/// the walk reaches the main chain.
fn ancestor_at<S: KeyValueStore>(
    store: &BlockchainStore<S>,
    from: &Chain,
    height: u32,
) -> BlockchainResult<Chain> {
    let mut cursor = from.clone();
    while cursor.height() > height {
        if cursor.on_main_chain {
            return load(store, &main_hash_at(store, height)?);
        }
        cursor = load(store, cursor.head.prev_hash())?;
    }
    Ok(cursor)
}

/// Target required of the block after `parent`.
fn target_after<S: KeyValueStore>(
    policy: &ConsensusPolicy,
    store: &BlockchainStore<S>,
    parent: &Chain,
) -> BlockchainResult<CompactTarget> {
    let tail_height = RetargetWindow::tail_height(policy, parent.height());
    let tail = ancestor_at(store, parent, tail_height)?;
    let window = RetargetWindow {
        head_height: parent.height(),
        head_timestamp: parent.head.header.timestamp,
        tail_timestamp: tail.head.header.timestamp,
        delta_total_work: parent.total_work.saturating_sub(tail.total_work),
    };
    Ok(next_target(policy, &window))
}

/// Hashes of the fork branch ending at `tip`, down to the main chain.
/// `None` if the branch no longer reaches the main chain.
fn branch_of<S: KeyValueStore>(
    store: &BlockchainStore<S>,
    tip: &Hash,
) -> BlockchainResult<Option<Vec<Hash>>> {
    let mut branch = Vec::new();
    let mut cursor = *tip;
    loop {
        match store.get(&cursor)? {
            Some(chain) if chain.on_main_chain => return Ok(Some(branch)),
            Some(chain) => {
                branch.push(cursor);
                cursor = *chain.head.prev_hash();
            }
            None => return Ok(None),
        }
    }
}

/// Undo `revert_first` (newest first), then re-apply `reapply` (newest
/// first, applied oldest first).
fn restore<A: AccountTree>(
    accounts: &mut A,
    revert_first: &[Chain],
    reapply: &[Chain],
) -> BlockchainResult<()> {
    for chain in revert_first {
        accounts.revert(&chain.head).map_err(|err| {
            BlockchainError::corrupted(format!("rollback revert of {} failed: {err}", chain.hash()))
        })?;
    }
    for chain in reapply.iter().rev() {
        accounts.apply(&chain.head).map_err(|err| {
            BlockchainError::corrupted(format!("rollback apply of {} failed: {err}", chain.hash()))
        })?;
    }
    Ok(())
}

/// Store-backed block source for proof construction.
struct StoreLookup<'a, S: KeyValueStore> {
    store: &'a BlockchainStore<S>,
}

impl<S: KeyValueStore> BlockLookup for StoreLookup<'_, S> {
    fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.store.get(hash).ok().flatten().map(|chain| chain.head)
    }
}

#[async_trait]
impl<A, S> BlockchainApi for Blockchain<A, S>
where
    A: AccountTree,
    S: KeyValueStore,
{
    fn policy(&self) -> &ConsensusPolicy {
        Blockchain::policy(self)
    }

    fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    fn head(&self) -> Block {
        Blockchain::head(self)
    }

    fn head_hash(&self) -> Hash {
        Blockchain::head_hash(self)
    }

    fn height(&self) -> u32 {
        Blockchain::height(self)
    }

    fn total_work(&self) -> u64 {
        Blockchain::total_work(self)
    }

    async fn push_block(&self, block: Block) -> BlockchainResult<PushResult> {
        Blockchain::push_block(self, block).await
    }

    async fn get_block(
        &self,
        hash: &Hash,
        include_forks: bool,
    ) -> BlockchainResult<Option<Block>> {
        Blockchain::get_block(self, hash, include_forks).await
    }

    async fn get_block_at(&self, height: u32) -> BlockchainResult<Option<Block>> {
        Blockchain::get_block_at(self, height).await
    }

    async fn contains(&self, hash: &Hash) -> BlockchainResult<bool> {
        Blockchain::contains(self, hash).await
    }

    async fn block_locators(&self) -> BlockchainResult<Vec<Hash>> {
        Blockchain::block_locators(self).await
    }

    async fn blocks_after(
        &self,
        locators: &[Hash],
        count: usize,
        direction: Direction,
    ) -> BlockchainResult<Vec<Hash>> {
        Blockchain::blocks_after(self, locators, count, direction).await
    }

    async fn chain_proof(&self) -> BlockchainResult<ChainProof> {
        Blockchain::chain_proof(self).await
    }

    fn subscribe(&self, listener: Arc<dyn ChainListener>) {
        Blockchain::subscribe(self, listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingListener;
    use crate::domain::AccountsError;
    use crate::test_utils::{
        extend, funded_blockchain, mine_next, mine_next_with, test_blockchain,
    };
    use kc_01_block_model::test_utils::{empty_body, genesis_block, mine_block_with};
    use kc_01_block_model::{BlockError, Transaction, U256};
    use kc_03_chain_store::{BatchOperation, DefaultChecksumProvider, KVStoreError};
    use std::sync::atomic::{AtomicBool, Ordering};

    const MINER_A: Address = Address([0xA; 20]);
    const MINER_B: Address = Address([0xB; 20]);
    const ALICE: Address = Address([1; 20]);
    const BOB: Address = Address([2; 20]);

    fn recording(chain: &Blockchain) -> Arc<RecordingListener> {
        let listener = Arc::new(RecordingListener::new());
        chain.subscribe(listener.clone());
        listener
    }

    async fn push_all(chain: &Blockchain, blocks: &[Block]) -> Vec<PushResult> {
        let mut results = Vec::new();
        for block in blocks {
            results.push(chain.push_block(block.clone()).await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_starts_at_genesis() {
        let chain = test_blockchain();
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.total_work(), 1);
        assert_eq!(chain.head_hash(), chain.genesis_hash());
        assert_eq!(
            chain.get_block_at(1).await.unwrap().map(|block| block.hash()),
            Some(chain.genesis_hash())
        );
    }

    #[tokio::test]
    async fn test_extend_main_chain() {
        let chain = test_blockchain();
        let listener = recording(&chain);

        let blocks = extend(&chain, 3, MINER_A).await;

        assert_eq!(chain.height(), 4);
        assert_eq!(chain.total_work(), 4);
        assert_eq!(chain.head_hash(), blocks[2].hash());
        assert_eq!(listener.head_changes(), 3);
        assert_eq!(
            chain.account(&MINER_A).await.balance,
            3 * chain.policy().block_reward
        );
    }

    #[tokio::test]
    async fn test_known_block() {
        let chain = test_blockchain();
        let block = mine_next(&chain, MINER_A).await;
        assert_eq!(chain.push_block(block.clone()).await.unwrap(), PushResult::Extended);
        assert_eq!(chain.push_block(block).await.unwrap(), PushResult::Known);
        assert_eq!(chain.height(), 2);
    }

    #[tokio::test]
    async fn test_orphan_block() {
        let chain = test_blockchain();
        let other = test_blockchain();
        let blocks = extend(&other, 2, MINER_B).await;

        let err = chain.push_block(blocks[1].clone()).await.unwrap_err();
        assert_eq!(
            err,
            BlockchainError::Orphan {
                hash: blocks[1].hash(),
                parent: blocks[0].hash(),
            }
        );
        assert_eq!(err.kind(), shared_types::ErrorKind::Orphan);
    }

    #[tokio::test]
    async fn test_invalid_proof_of_work_rejected() {
        let chain = test_blockchain();
        let listener = recording(&chain);
        let mut block = chain
            .block_template(empty_body(MINER_A), 0)
            .await
            .unwrap();
        while block.header.verify_proof_of_work() {
            block.header.nonce += 1;
        }
        let hash = block.hash();

        let err = chain.push_block(block).await.unwrap_err();
        assert_eq!(
            err,
            BlockchainError::InvalidBlock {
                hash,
                reason: InvalidReason::Block(BlockError::InvalidProofOfWork),
            }
        );
        assert!(!chain.contains(&hash).await.unwrap());
        let (max_hash, _) = chain.max_work_chain().await.unwrap().unwrap();
        assert_ne!(max_hash, hash);
        assert_eq!(chain.height(), 1);
        assert!(matches!(
            listener.events().as_slice(),
            [ChainEvent::BlockRejected { .. }]
        ));
    }

    #[tokio::test]
    async fn test_light_block_rejected() {
        let chain = test_blockchain();
        let block = mine_next(&chain, MINER_A).await.to_light();
        let err = chain.push_block(block).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidBlock {
                reason: InvalidReason::MissingBody,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_wrong_target_rejected() {
        let chain = test_blockchain();
        let head = chain.head();
        let harder = CompactTarget::from_target(chain.policy().block_target_max / U256::from(2));
        let block = mine_block_with(
            &head,
            harder,
            head.header.timestamp + 60,
            Some(empty_body(MINER_A)),
            Hash::ZERO,
        );
        let err = chain.push_block(block).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidBlock {
                reason: InvalidReason::WrongTarget { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_accounts_hash_mismatch_rejected() {
        let chain = test_blockchain();
        let root = chain.accounts_root().await;
        let head = chain.head();
        let block = mine_block_with(
            &head,
            head.header.n_bits,
            head.header.timestamp + 60,
            Some(empty_body(MINER_A)),
            Hash([7; 32]),
        );
        let err = chain.push_block(block).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidBlock {
                reason: InvalidReason::AccountsHashMismatch { .. },
                ..
            }
        ));
        assert_eq!(chain.accounts_root().await, root);
        assert_eq!(chain.height(), 1);
    }

    #[tokio::test]
    async fn test_equal_work_fork_keeps_head() {
        let chain = test_blockchain();
        let main = extend(&chain, 2, MINER_A).await;
        let other = test_blockchain();
        let fork = extend(&other, 2, MINER_B).await;

        let results = push_all(&chain, &fork).await;
        assert_eq!(results, vec![PushResult::Forked, PushResult::Forked]);
        assert_eq!(chain.head_hash(), main[1].hash());
        assert!(chain.get_block(&fork[1].hash(), false).await.unwrap().is_none());
        assert!(chain.get_block(&fork[1].hash(), true).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_heavier_fork_rebranches() {
        let chain = test_blockchain();
        let main = extend(&chain, 2, MINER_A).await;
        let other = test_blockchain();
        let fork = extend(&other, 3, MINER_B).await;
        let listener = recording(&chain);

        let results = push_all(&chain, &fork).await;
        assert_eq!(
            results,
            vec![PushResult::Forked, PushResult::Forked, PushResult::Rebranched]
        );
        assert_eq!(chain.head_hash(), fork[2].hash());
        assert_eq!(chain.total_work(), 4);
        assert_eq!(listener.head_changes(), 1);
        assert_eq!(chain.accounts_root().await, other.accounts_root().await);
        assert_eq!(chain.account(&MINER_A).await, Account::default());

        match listener.events().as_slice() {
            [ChainEvent::HeadChanged {
                head,
                applied,
                reverted,
            }] => {
                assert_eq!(head.hash(), fork[2].hash());
                let applied: Vec<Hash> = applied.iter().map(Block::hash).collect();
                let reverted: Vec<Hash> = reverted.iter().map(Block::hash).collect();
                assert_eq!(applied, fork.iter().map(Block::hash).collect::<Vec<_>>());
                assert_eq!(reverted, vec![main[1].hash(), main[0].hash()]);
            }
            events => panic!("unexpected events {events:?}"),
        }

        // Height index follows the new main chain.
        for (i, block) in fork.iter().enumerate() {
            let at = chain.get_block_at(i as u32 + 2).await.unwrap().unwrap();
            assert_eq!(at.hash(), block.hash());
        }
        assert!(chain.get_block(&main[1].hash(), false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_push_order_does_not_matter() {
        let source_a = test_blockchain();
        let chain_a = extend(&source_a, 2, MINER_A).await;
        let source_b = test_blockchain();
        let chain_b = extend(&source_b, 3, MINER_B).await;

        let first = test_blockchain();
        push_all(&first, &chain_a).await;
        push_all(&first, &chain_b).await;

        let second = test_blockchain();
        push_all(&second, &chain_b).await;
        push_all(&second, &chain_a).await;

        assert_eq!(first.head_hash(), chain_b[2].hash());
        assert_eq!(second.head_hash(), chain_b[2].hash());
        assert_eq!(first.accounts_root().await, second.accounts_root().await);
        assert_eq!(first.accounts_root().await, source_b.accounts_root().await);
    }

    #[tokio::test]
    async fn test_failed_rebranch_rolls_back() {
        let chain = test_blockchain();
        let main = extend(&chain, 2, MINER_A).await;
        let root = chain.accounts_root().await;

        let other = test_blockchain();
        let fork = extend(&other, 2, MINER_B).await;
        let bad = mine_block_with(
            &fork[1],
            fork[1].header.n_bits,
            fork[1].header.timestamp + 60,
            Some(empty_body(MINER_B)),
            Hash([7; 32]),
        );

        push_all(&chain, &fork).await;
        let listener = recording(&chain);
        let err = chain.push_block(bad.clone()).await.unwrap_err();

        assert!(matches!(
            err,
            BlockchainError::InvalidBlock {
                hash,
                reason: InvalidReason::AccountsHashMismatch { .. },
            } if hash == bad.hash()
        ));
        assert_eq!(chain.head_hash(), main[1].hash());
        assert_eq!(chain.total_work(), 3);
        assert_eq!(chain.accounts_root().await, root);
        assert_eq!(listener.head_changes(), 0);
        assert!(!chain.contains(&bad.hash()).await.unwrap());
        assert!(chain.contains(&fork[1].hash()).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_rebranch_discards_invalid_ancestor() {
        let chain = test_blockchain();
        let main = extend(&chain, 2, MINER_A).await;
        let root = chain.accounts_root().await;

        let other = test_blockchain();
        let fork = extend(&other, 1, MINER_B).await;
        let bad = mine_block_with(
            &fork[0],
            fork[0].header.n_bits,
            fork[0].header.timestamp + 60,
            Some(empty_body(MINER_B)),
            Hash([7; 32]),
        );
        let tip = mine_block_with(
            &bad,
            bad.header.n_bits,
            bad.header.timestamp + 60,
            Some(empty_body(MINER_B)),
            Hash::ZERO,
        );

        assert_eq!(
            push_all(&chain, &[fork[0].clone(), bad.clone()]).await,
            vec![PushResult::Forked, PushResult::Forked]
        );
        let err = chain.push_block(tip.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidBlock { hash, .. } if hash == bad.hash()
        ));
        assert_eq!(chain.head_hash(), main[1].hash());
        assert_eq!(chain.accounts_root().await, root);
        assert!(!chain.contains(&bad.hash()).await.unwrap());
        assert!(!chain.contains(&tip.hash()).await.unwrap());
        assert!(chain.contains(&fork[0].hash()).await.unwrap());
    }

    #[tokio::test]
    async fn test_fork_tips_are_bounded() {
        let chain = test_blockchain();
        extend(&chain, 3, MINER_A).await;
        let genesis = genesis_block(chain.policy());

        let mut forks = Vec::new();
        for i in 1..=5u8 {
            let block = mine_block_with(
                &genesis,
                genesis.header.n_bits,
                genesis.header.timestamp + 60,
                Some(empty_body(Address([i; 20]))),
                Hash::ZERO,
            );
            assert_eq!(
                chain.push_block(block.clone()).await.unwrap(),
                PushResult::Forked
            );
            forks.push(block);
        }

        let mut kept = 0;
        for block in &forks {
            if chain.contains(&block.hash()).await.unwrap() {
                kept += 1;
            }
        }
        assert_eq!(kept, chain.config().max_forks);
    }

    #[tokio::test]
    async fn test_locators_and_blocks_after() {
        let chain = test_blockchain();
        let blocks = extend(&chain, 15, MINER_A).await;
        // blocks[i] sits at height i + 2
        let at = |height: u32| blocks[height as usize - 2].hash();

        let locators = chain.block_locators().await.unwrap();
        assert_eq!(locators.len(), 13);
        assert_eq!(locators[0], chain.head_hash());
        assert_eq!(locators[10], at(6));
        assert_eq!(locators.last(), Some(&chain.genesis_hash()));

        let forward = chain
            .blocks_after(&[at(5)], 3, Direction::Forward)
            .await
            .unwrap();
        assert_eq!(forward, vec![at(6), at(7), at(8)]);

        let backward = chain
            .blocks_after(&[at(5)], 3, Direction::Backward)
            .await
            .unwrap();
        assert_eq!(backward, vec![at(4), at(3), at(2)]);

        let unknown = chain
            .blocks_after(&[Hash([0xEE; 32]), at(14)], 10, Direction::Forward)
            .await
            .unwrap();
        assert_eq!(unknown, vec![at(15), at(16)]);

        let from_genesis = chain
            .blocks_after(&[Hash([0xEE; 32])], 2, Direction::Forward)
            .await
            .unwrap();
        assert_eq!(from_genesis, vec![at(2), at(3)]);
    }

    #[tokio::test]
    async fn test_chain_proof_reports_total_work() {
        let chain = test_blockchain();
        extend(&chain, 8, MINER_A).await;
        let proof = chain.chain_proof().await.unwrap();
        assert_eq!(proof.head_hash(), Some(chain.head_hash()));
        let work = proof
            .verify(chain.policy(), &chain.genesis_hash())
            .unwrap();
        assert_eq!(work, chain.total_work());
    }

    #[tokio::test]
    async fn test_next_target_of_unknown_parent() {
        let chain = test_blockchain();
        assert_eq!(chain.next_target(&Hash([1; 32])).await.unwrap(), None);
        assert_eq!(
            chain.next_target(&chain.genesis_hash()).await.unwrap(),
            Some(chain.policy().max_compact())
        );
    }

    #[tokio::test]
    async fn test_concurrent_pushes_are_serialized() {
        let chain = Arc::new(test_blockchain());
        let block = mine_next(&*chain, MINER_A).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let chain = Arc::clone(&chain);
            let block = block.clone();
            handles.push(tokio::spawn(async move { chain.push_block(block).await }));
        }

        let mut extended = 0;
        let mut known = 0;
        for handle in handles {
            match handle.await.unwrap().unwrap() {
                PushResult::Extended => extended += 1,
                PushResult::Known => known += 1,
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!((extended, known), (1, 7));
        assert_eq!(chain.height(), 2);
    }

    #[tokio::test]
    async fn test_transactions_move_balances() {
        let chain = funded_blockchain([(ALICE, 1_000)]);
        let tx = Transaction::new(ALICE, BOB, 300, 10, 0, vec![]).unwrap();
        let body = Body::new(MINER_A, vec![], vec![tx]).unwrap();
        let block = mine_next_with(&chain, body).await;

        assert_eq!(chain.push_block(block).await.unwrap(), PushResult::Extended);
        assert_eq!(chain.account(&ALICE).await, Account { balance: 690, nonce: 1 });
        assert_eq!(chain.account(&BOB).await.balance, 300);
        assert_eq!(
            chain.account(&MINER_A).await.balance,
            chain.policy().block_reward + 10
        );
    }

    #[tokio::test]
    async fn test_overdraft_rejected() {
        let chain = funded_blockchain([(ALICE, 100)]);
        let tx = Transaction::new(ALICE, BOB, 300, 0, 0, vec![]).unwrap();
        let body = Body::new(MINER_A, vec![], vec![tx]).unwrap();
        let head = chain.head();
        let block = mine_block_with(
            &head,
            head.header.n_bits,
            head.header.timestamp + 60,
            Some(body),
            Hash::ZERO,
        );

        let err = chain.push_block(block).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidBlock {
                reason: InvalidReason::Accounts(AccountsError::InsufficientBalance { .. }),
                ..
            }
        ));
        assert_eq!(err.kind(), shared_types::ErrorKind::InvalidBlock);
    }

    #[tokio::test]
    async fn test_future_timestamp_rejected() {
        let clock = Arc::new(shared_types::ManualTimeSource::new(0));
        let chain = test_blockchain().with_time_source(Box::new(Arc::clone(&clock)));
        let block = mine_next(&chain, MINER_A).await;

        let err = chain.push_block(block.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InvalidBlock {
                reason: InvalidReason::Block(BlockError::TimestampTooFarInFuture { .. }),
                ..
            }
        ));

        clock.set(u64::from(block.header.timestamp));
        assert_eq!(chain.push_block(block).await.unwrap(), PushResult::Extended);
    }

    #[tokio::test]
    async fn test_resume_from_store() {
        let policy = ConsensusPolicy::for_testing();
        let genesis = genesis_block(&policy);
        let chain = test_blockchain();
        let blocks = extend(&chain, 2, MINER_A).await;

        let mut accounts = InMemoryAccountTree::new(policy.block_reward);
        let mut store = BlockchainStore::in_memory();
        let mut work = 1;
        let mut records = vec![Chain::new(genesis.clone(), 1, true)];
        for block in &blocks {
            accounts.apply(block).unwrap();
            work += 1;
            records.push(Chain::new(block.clone(), work, true));
        }
        for (i, record) in records.iter().enumerate() {
            store.put(record).unwrap();
            store.set_main_at(i as u32 + 1, &record.hash()).unwrap();
        }

        let resumed =
            Blockchain::new(BlockchainConfig::for_testing(), genesis, accounts, store).unwrap();
        assert_eq!(resumed.head_hash(), blocks[1].hash());
        assert_eq!(resumed.total_work(), 3);
    }

    /// Backend whose writes fail once `failing` is set.
    struct FlakyKVStore {
        inner: InMemoryKVStore,
        failing: Arc<AtomicBool>,
    }

    impl FlakyKVStore {
        fn check(&self) -> Result<(), KVStoreError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(KVStoreError::Io("disk full".into()));
            }
            Ok(())
        }
    }

    impl KeyValueStore for FlakyKVStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
            self.inner.get(key)
        }

        fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
            self.check()?;
            self.inner.put(key, value)
        }

        fn delete(&mut self, key: &[u8]) -> Result<(), KVStoreError> {
            self.check()?;
            self.inner.delete(key)
        }

        fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
            self.check()?;
            self.inner.atomic_batch_write(operations)
        }

        fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
            self.inner.prefix_scan(prefix)
        }
    }

    /// Account tree that refuses to revert.
    struct StuckAccountTree(InMemoryAccountTree);

    impl AccountTree for StuckAccountTree {
        fn apply(&mut self, block: &Block) -> Result<Hash, AccountsError> {
            self.0.apply(block)
        }

        fn revert(&mut self, block: &Block) -> Result<Hash, AccountsError> {
            Err(AccountsError::StateMismatch(block.hash()))
        }

        fn root(&self) -> Hash {
            self.0.root()
        }

        fn account(&self, address: &Address) -> Account {
            self.0.account(address)
        }

        fn compute_state_root(&self, body: &Body) -> Result<Hash, AccountsError> {
            self.0.compute_state_root(body)
        }
    }

    fn flaky_blockchain<A: AccountTree>(
        accounts: A,
        failing: &Arc<AtomicBool>,
    ) -> Blockchain<A, FlakyKVStore> {
        let config = BlockchainConfig::for_testing();
        let genesis = genesis_block(&config.policy);
        let kv = FlakyKVStore {
            inner: InMemoryKVStore::new(),
            failing: Arc::clone(failing),
        };
        let store = BlockchainStore::new(kv, DefaultChecksumProvider);
        Blockchain::new(config, genesis, accounts, store).unwrap()
    }

    #[tokio::test]
    async fn test_store_failure_on_extend_rolls_back_accounts() {
        let failing = Arc::new(AtomicBool::new(false));
        let policy = ConsensusPolicy::for_testing();
        let chain = flaky_blockchain(InMemoryAccountTree::new(policy.block_reward), &failing);
        let block = mine_next(&chain, MINER_A).await;
        let root_before = chain.state.lock().await.accounts.root();

        failing.store(true, Ordering::SeqCst);
        let err = chain.push_block(block.clone()).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Store(_)));
        assert_eq!(chain.state.lock().await.accounts.root(), root_before);
        assert_eq!(chain.height(), 1);

        failing.store(false, Ordering::SeqCst);
        assert_eq!(chain.push_block(block).await.unwrap(), PushResult::Extended);
    }

    #[tokio::test]
    async fn test_failed_rollback_after_store_failure_is_corruption() {
        let failing = Arc::new(AtomicBool::new(false));
        let policy = ConsensusPolicy::for_testing();
        let accounts = StuckAccountTree(InMemoryAccountTree::new(policy.block_reward));
        let chain = flaky_blockchain(accounts, &failing);
        let block = mine_next(&chain, MINER_A).await;

        failing.store(true, Ordering::SeqCst);
        let err = chain.push_block(block).await.unwrap_err();
        assert!(matches!(err, BlockchainError::Corrupted(_)), "{err}");
        assert_eq!(err.kind(), shared_types::ErrorKind::Internal);
        assert_eq!(chain.height(), 1);
    }
}
