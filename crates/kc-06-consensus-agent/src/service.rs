//! # Consensus Agent Service
//!
//! [`ConsensusAgent`] owns one peer connection and runs until it closes.
//! [`AgentHandle`] is the cloneable side the host keeps for relaying and
//! for closing the connection.
//!
//! The run loop multiplexes inbound frames, relay commands, a timer tick and
//! the node-wide shutdown signal. Every chain mutation goes through
//! [`BlockchainApi::push_block`], so agents never observe a partial reorg.

use std::sync::Arc;

use kc_01_block_model::{Block, Transaction};
use kc_02_chain_proof::ChainProof;
use kc_04_blockchain::{BlockchainApi, Direction, PushResult};
use kc_05_wire_protocol::{
    GetBlocksDirection, GetBlocksMessage, InvType, InvVector, Inventory, Message,
    MessageFactory, MessageType, RejectCode, RejectMessage, Services, Subscription,
    VersionMessage, CHALLENGE_SIZE, GETBLOCKS_LOCATORS_MAX, PROTOCOL_VERSION,
};
use parking_lot::RwLock;
use rand::RngCore;
use shared_types::{ErrorKind, FixedBytes, Hash};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::adapters::InMemoryMempool;
use crate::config::{AgentConfig, SyncMode};
use crate::domain::{
    penalty_for, AgentError, AgentResult, AgentState, BanList, CloseReason, KnownInventory,
    PeerAddress, Penalty, RoundOutcome, SyncTracker, GETBLOCKS_VECTORS_MAX,
};
use crate::ports::inbound::PeerRelay;
use crate::ports::outbound::{Mempool, PeerChannel};

const REJECT_REASON_MAX: usize = 255;

// =============================================================================
// HANDLE
// =============================================================================

enum Command {
    RelayBlock(Box<Block>),
    RelayTransaction(Transaction),
    Close,
}

/// Host-side handle of a running agent.
#[derive(Clone)]
pub struct AgentHandle {
    peer: PeerAddress,
    state: Arc<RwLock<AgentState>>,
    commands: mpsc::UnboundedSender<Command>,
}

impl AgentHandle {
    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    pub fn state(&self) -> AgentState {
        *self.state.read()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == AgentState::Closed || self.commands.is_closed()
    }

    /// Ask the agent to close the connection.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

impl PeerRelay for AgentHandle {
    fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    fn state(&self) -> AgentState {
        AgentHandle::state(self)
    }

    fn relay_block(&self, block: &Block) -> bool {
        self.commands
            .send(Command::RelayBlock(Box::new(block.clone())))
            .is_ok()
    }

    fn relay_transaction(&self, tx: &Transaction) -> bool {
        self.commands
            .send(Command::RelayTransaction(tx.clone()))
            .is_ok()
    }
}

// =============================================================================
// AGENT
// =============================================================================

#[derive(Debug, Default)]
struct PingState {
    next_at: Option<Instant>,
    /// Nonce and deadline of the unanswered ping
    outstanding: Option<(u32, Instant)>,
}

/// Per-peer consensus state machine.
pub struct ConsensusAgent<C, M = InMemoryMempool>
where
    C: PeerChannel,
    M: Mempool,
{
    config: AgentConfig,
    peer: PeerAddress,
    channel: C,
    blockchain: Arc<dyn BlockchainApi>,
    mempool: Arc<M>,
    bans: Arc<BanList>,
    state: Arc<RwLock<AgentState>>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: watch::Receiver<bool>,

    challenge_nonce: [u8; CHALLENGE_SIZE],
    peer_version: Option<VersionMessage>,
    verack_received: bool,
    handshake_deadline: Option<Instant>,
    proof_deadline: Option<Instant>,
    /// Latest head the peer told us about
    peer_head: Option<Hash>,
    /// What the peer wants announced
    subscription: Subscription,
    sync: SyncTracker,
    known: KnownInventory,
    ping: PingState,
    strikes: u32,
    close_reason: Option<CloseReason>,
}

impl<C, M> ConsensusAgent<C, M>
where
    C: PeerChannel,
    M: Mempool,
{
    pub fn new(
        config: AgentConfig,
        channel: C,
        blockchain: Arc<dyn BlockchainApi>,
        mempool: Arc<M>,
        bans: Arc<BanList>,
        shutdown: watch::Receiver<bool>,
    ) -> (Self, AgentHandle) {
        let peer = channel.peer_address().clone();
        let state = Arc::new(RwLock::new(AgentState::Connecting));
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let mut challenge_nonce = [0u8; CHALLENGE_SIZE];
        rand::thread_rng().fill_bytes(&mut challenge_nonce);

        let handle = AgentHandle {
            peer: peer.clone(),
            state: Arc::clone(&state),
            commands: commands_tx,
        };
        let agent = Self {
            known: KnownInventory::new(config.known_inventory_capacity),
            config,
            peer,
            channel,
            blockchain,
            mempool,
            bans,
            state,
            commands,
            shutdown,
            challenge_nonce,
            peer_version: None,
            verack_received: false,
            handshake_deadline: None,
            proof_deadline: None,
            peer_head: None,
            subscription: Subscription::None,
            sync: SyncTracker::new(),
            ping: PingState::default(),
            strikes: 0,
            close_reason: None,
        };
        (agent, handle)
    }

    pub fn peer(&self) -> &PeerAddress {
        &self.peer
    }

    pub fn state(&self) -> AgentState {
        *self.state.read()
    }

    /// Run until the connection closes. Returns why it closed.
    #[instrument(name = "agent", skip(self), fields(peer = %self.peer))]
    pub async fn run(mut self) -> CloseReason {
        let reason = self.drive().await;
        self.set_state(AgentState::Closed);
        self.channel.close().await;
        match reason {
            CloseReason::PeerClosed | CloseReason::Shutdown | CloseReason::Requested => {
                debug!(%reason, "Connection closed")
            }
            reason if reason.bans_peer() => warn!(%reason, "Peer disconnected and banned"),
            reason => warn!(%reason, "Peer disconnected"),
        }
        reason
    }

    async fn drive(&mut self) -> CloseReason {
        if self.bans.is_banned(&self.peer) {
            return CloseReason::Banned;
        }
        if *self.shutdown.borrow() {
            return CloseReason::Shutdown;
        }
        self.start_handshake().await;

        let mut tick = time::interval(self.config.tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            if let Some(reason) = self.close_reason.take() {
                return reason;
            }
            tokio::select! {
                frame = self.channel.recv() => match frame {
                    Some(frame) => self.on_frame(&frame).await,
                    None => return CloseReason::PeerClosed,
                },
                Some(command) = self.commands.recv() => self.on_command(command).await,
                _ = tick.tick() => self.on_tick().await,
                Ok(()) = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        return CloseReason::Shutdown;
                    }
                }
            }
        }
    }

    fn set_state(&self, state: AgentState) {
        let mut current = self.state.write();
        if *current != state {
            trace!(from = %*current, to = %state, "State change");
            *current = state;
        }
    }

    fn close(&mut self, reason: CloseReason) {
        if self.close_reason.is_none() {
            self.close_reason = Some(reason);
        }
    }

    async fn send(&mut self, message: Message) {
        if self.close_reason.is_some() {
            return;
        }
        trace!(message_type = %message.message_type(), "Sending");
        let frame = MessageFactory::encode(&message);
        if let Err(err) = self.channel.send(frame).await {
            debug!(%err, "Send failed");
            self.close(CloseReason::TransportError);
        }
    }

    async fn send_reject(&mut self, message_type: u32, code: RejectCode, reason: &str, extra: Vec<u8>) {
        let reason: String = reason
            .chars()
            .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
            .take(REJECT_REASON_MAX)
            .collect();
        match RejectMessage::new(message_type, code, reason, extra) {
            Ok(reject) => self.send(Message::Reject(reject)).await,
            Err(err) => error!(%err, "Could not build reject"),
        }
    }

    // -------------------------------------------------------------------------
    // Errors and penalties
    // -------------------------------------------------------------------------

    async fn on_error(&mut self, err: AgentError) {
        let kind = err.kind();
        match penalty_for(kind) {
            Penalty::None if kind == ErrorKind::Internal => error!(%err, "Local failure"),
            Penalty::None => debug!(%err, "Ignoring"),
            Penalty::Strike => {
                self.strikes += 1;
                warn!(%err, strikes = self.strikes, "Peer sent bad input");
                if self.strikes >= self.config.max_strikes {
                    self.ban(kind);
                }
            }
            Penalty::Disconnect => {
                warn!(%err, "Peer unresponsive");
                self.close(match kind {
                    ErrorKind::HandshakeTimeout => CloseReason::HandshakeTimeout,
                    _ => CloseReason::RequestTimeout,
                });
            }
            Penalty::Ban => {
                warn!(%err, "Peer misbehaved");
                self.ban(kind);
            }
        }
    }

    fn ban(&mut self, kind: ErrorKind) {
        self.bans
            .ban(&self.peer, self.config.ban_duration_secs, kind);
        self.close(CloseReason::Misbehaviour(kind));
    }

    fn reject_code_for(kind: ErrorKind) -> Option<RejectCode> {
        match kind {
            ErrorKind::MalformedInput => Some(RejectCode::Malformed),
            ErrorKind::InvalidBlock | ErrorKind::InvalidTransaction => Some(RejectCode::Invalid),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Inbound frames
    // -------------------------------------------------------------------------

    async fn on_frame(&mut self, frame: &[u8]) {
        let message = match MessageFactory::parse(frame) {
            Ok(message) => message,
            Err(err) => {
                let err = AgentError::from(err);
                if let (Some(code), Ok(tag)) =
                    (Self::reject_code_for(err.kind()), MessageFactory::peek_type(frame))
                {
                    self.send_reject(tag, code, &err.to_string(), Vec::new()).await;
                }
                self.on_error(err).await;
                return;
            }
        };
        trace!(message_type = %message.message_type(), "Received");
        if let Err(err) = self.on_message(message).await {
            self.on_error(err).await;
        }
    }

    async fn on_message(&mut self, message: Message) -> AgentResult<()> {
        match message {
            Message::Version(version) => self.on_version(version).await,
            Message::VerAck => self.on_verack().await,
            Message::Ping(nonce) => {
                self.send(Message::Pong(nonce)).await;
                Ok(())
            }
            Message::Pong(nonce) => {
                self.on_pong(nonce);
                Ok(())
            }
            Message::Reject(reject) => {
                debug!(
                    message_type = reject.message_type,
                    code = ?reject.code,
                    reason = reject.reason(),
                    "Peer rejected a message"
                );
                Ok(())
            }
            other if !self.state().is_ready() => {
                debug!(message_type = %other.message_type(), "Ignoring message before handshake");
                Ok(())
            }
            Message::Inv(inventory) => self.on_inv(inventory).await,
            Message::GetData(inventory) => self.on_get_data(inventory).await,
            Message::NotFound(inventory) => self.on_not_found(inventory).await,
            Message::GetBlocks(request) => self.on_get_blocks(request).await,
            Message::GetHead => {
                let header = self.blockchain.head().header;
                self.send(Message::Head(header)).await;
                Ok(())
            }
            Message::Head(header) => {
                let hash = header.hash();
                self.peer_head = Some(hash);
                if self.state() == AgentState::Established
                    && !self.blockchain.contains(&hash).await?
                {
                    self.request_blocks().await?;
                }
                Ok(())
            }
            Message::Block(block) => self.on_block(*block).await,
            Message::Tx(tx) => self.on_tx(tx).await,
            Message::GetChainProof => {
                let proof = self.blockchain.chain_proof().await?;
                self.send(Message::chain_proof(proof)).await;
                Ok(())
            }
            Message::ChainProof(proof) => self.on_chain_proof(*proof).await,
            Message::Mempool => self.on_mempool_request().await,
            Message::Subscribe(subscription) => {
                debug!(?subscription, "Peer subscribed");
                self.subscription = subscription;
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Handshake
    // -------------------------------------------------------------------------

    async fn start_handshake(&mut self) {
        let agent = self.config.user_agent.clone();
        let version = VersionMessage::new(
            PROTOCOL_VERSION,
            self.config.sync_mode.services(),
            self.blockchain.genesis_hash(),
            self.blockchain.head_hash(),
            self.challenge_nonce,
            agent,
        )
        .or_else(|err| {
            warn!(%err, "Configured user agent unusable, sending none");
            VersionMessage::new(
                PROTOCOL_VERSION,
                self.config.sync_mode.services(),
                self.blockchain.genesis_hash(),
                self.blockchain.head_hash(),
                self.challenge_nonce,
                None,
            )
        });
        match version {
            Ok(version) => self.send(Message::Version(version)).await,
            Err(err) => {
                error!(%err, "Could not build version");
                self.close(CloseReason::TransportError);
                return;
            }
        }
        self.set_state(AgentState::Handshake);
        self.handshake_deadline = Some(Instant::now() + self.config.handshake_timeout());
    }

    async fn on_version(&mut self, version: VersionMessage) -> AgentResult<()> {
        if self.peer_version.is_some() {
            debug!("Duplicate version ignored");
            return Ok(());
        }
        if version.challenge_nonce == self.challenge_nonce {
            info!("Connected to self");
            self.close(CloseReason::SelfConnection);
            return Ok(());
        }
        if !version.is_compatible(&self.blockchain.genesis_hash()) {
            info!(
                version = version.version,
                genesis = %version.genesis_hash,
                "Incompatible peer"
            );
            self.send_reject(
                MessageType::Version.tag(),
                RejectCode::Obsolete,
                "incompatible version or genesis",
                Vec::new(),
            )
            .await;
            self.close(CloseReason::Incompatible);
            return Ok(());
        }
        self.peer_head = Some(version.head_hash);
        self.peer_version = Some(version);
        self.send(Message::VerAck).await;
        self.complete_handshake().await
    }

    async fn on_verack(&mut self) -> AgentResult<()> {
        self.verack_received = true;
        self.complete_handshake().await
    }

    async fn complete_handshake(&mut self) -> AgentResult<()> {
        if self.state() != AgentState::Handshake || !self.verack_received {
            return Ok(());
        }
        let Some(version) = &self.peer_version else {
            return Ok(());
        };
        info!(
            user_agent = version.user_agent().unwrap_or("-"),
            services = version.services.0,
            peer_head = %version.head_hash,
            "Handshake completed"
        );
        self.handshake_deadline = None;
        self.set_state(AgentState::Syncing);
        let subscription = self.config.subscription.clone();
        self.send(Message::Subscribe(subscription)).await;
        self.start_sync().await
    }

    fn peer_services(&self) -> Services {
        self.peer_version
            .as_ref()
            .map_or(Services::NONE, |version| version.services)
    }

    // -------------------------------------------------------------------------
    // Sync
    // -------------------------------------------------------------------------

    async fn start_sync(&mut self) -> AgentResult<()> {
        if self.config.sync_mode == SyncMode::Light && self.peer_services().provides(Services::FULL)
        {
            debug!("Requesting chain proof");
            self.send(Message::GetChainProof).await;
            self.proof_deadline = Some(Instant::now() + self.config.request_timeout());
            return Ok(());
        }
        self.sync_round().await
    }

    /// Start a round unless the peer's head is already known.
    async fn sync_round(&mut self) -> AgentResult<()> {
        if self.caught_up().await? {
            self.set_established();
            return Ok(());
        }
        self.request_blocks().await
    }

    async fn caught_up(&self) -> AgentResult<bool> {
        match &self.peer_head {
            Some(head) => Ok(self.blockchain.contains(head).await?),
            None => Ok(false),
        }
    }

    fn set_established(&mut self) {
        if self.state() != AgentState::Syncing {
            return;
        }
        self.set_state(AgentState::Established);
        self.proof_deadline = None;
        self.ping.next_at = Some(Instant::now() + self.config.ping_interval());
        info!(
            head = %self.blockchain.head_hash(),
            height = self.blockchain.height(),
            work = self.blockchain.total_work(),
            "Sync finished"
        );
    }

    async fn request_blocks(&mut self) -> AgentResult<()> {
        if self.sync.is_awaiting_inventory() {
            return Ok(());
        }
        let mut locators = self.blockchain.block_locators().await?;
        locators.truncate(GETBLOCKS_LOCATORS_MAX);
        let request = GetBlocksMessage::new(
            locators,
            self.config.max_inv_size,
            GetBlocksDirection::Forward,
        )
        .map_err(|err| AgentError::Internal(err.to_string()))?;
        debug!(locators = request.locators().len(), "Requesting blocks");
        let locators = request.locators().to_vec();
        self.send(Message::GetBlocks(request)).await;
        self.sync
            .getblocks_sent(&locators, Instant::now(), self.config.request_timeout());
        Ok(())
    }

    /// Close a completed round while syncing and decide what comes next.
    async fn check_round(&mut self) -> AgentResult<()> {
        if self.state() != AgentState::Syncing
            || self.proof_deadline.is_some()
            || !self.sync.round_complete()
        {
            return Ok(());
        }
        let outcome = self.sync.finish_round(self.config.max_sync_attempts);
        if self.caught_up().await? {
            self.set_established();
            return Ok(());
        }
        match outcome {
            RoundOutcome::Continue => self.request_blocks().await,
            RoundOutcome::GiveUp => {
                info!(
                    rounds = self.sync.failed_rounds(),
                    "No progress from peer, giving up on sync"
                );
                self.set_established();
                Ok(())
            }
        }
    }

    async fn on_inv(&mut self, inventory: Inventory) -> AgentResult<()> {
        let listed: Vec<Hash> = inventory
            .vectors()
            .iter()
            .filter(|vector| vector.inv_type == InvType::Block)
            .map(|vector| vector.hash)
            .collect();
        let only_blocks = listed.len() == inventory.len();
        let mut answered = self.sync.inventory_received(&listed, only_blocks);
        if let [single] = listed.as_slice() {
            if only_blocks && self.sync.is_awaiting_inventory() {
                if let Some(block) = self.blockchain.get_block(single, true).await? {
                    answered = self.sync.block_received(&block);
                }
            }
        }
        let mut wanted = Vec::new();
        let mut wanted_blocks = Vec::new();
        for vector in inventory.into_vectors() {
            self.known.insert(vector.hash);
            match vector.inv_type {
                InvType::Block => {
                    if !self.sync.is_pending(&vector.hash)
                        && !self.blockchain.contains(&vector.hash).await?
                    {
                        wanted_blocks.push(vector.hash);
                        wanted.push(vector);
                    }
                }
                InvType::Transaction => {
                    if self.state() == AgentState::Established
                        && !self.mempool.contains(&vector.hash)
                    {
                        wanted.push(vector);
                    }
                }
                InvType::Error => {}
            }
        }
        trace!(answered, wanted = wanted.len(), "Inventory received");
        for chunk in Inventory::chunked(wanted) {
            self.send(Message::GetData(chunk)).await;
        }
        self.sync.blocks_requested(
            wanted_blocks,
            Instant::now(),
            self.config.request_timeout(),
        );
        self.check_round().await
    }

    async fn on_not_found(&mut self, inventory: Inventory) -> AgentResult<()> {
        let now = Instant::now();
        for vector in inventory.vectors() {
            if vector.inv_type == InvType::Block {
                self.sync
                    .resolve(&vector.hash, now, self.config.request_timeout());
            }
        }
        self.check_round().await
    }

    async fn on_block(&mut self, block: Block) -> AgentResult<()> {
        let hash = block.hash();
        self.known.insert(hash);
        self.sync
            .resolve(&hash, Instant::now(), self.config.request_timeout());
        self.sync.block_received(&block);
        let syncing = self.state() == AgentState::Syncing;

        match self.blockchain.push_block(block.clone()).await {
            Ok(PushResult::Extended | PushResult::Rebranched) => {
                if syncing {
                    self.sync.note_extending();
                }
            }
            Ok(PushResult::Forked) => {
                if syncing && !self.sync.note_fork(&block) {
                    warn!(%hash, "Peer is sending unrelated fork blocks");
                    self.close(CloseReason::ConspicuousFork);
                    return Ok(());
                }
            }
            Ok(PushResult::Known) => {}
            Err(err) if err.kind() == ErrorKind::Orphan => {
                debug!(%hash, "Orphan block, requesting ancestors");
                self.request_blocks().await?;
            }
            Err(err) => {
                if let Some(code) = Self::reject_code_for(err.kind()) {
                    self.send_reject(
                        MessageType::Block.tag(),
                        code,
                        &err.to_string(),
                        hash.as_bytes().to_vec(),
                    )
                    .await;
                }
                return Err(err.into());
            }
        }
        self.check_round().await
    }

    async fn on_tx(&mut self, tx: Transaction) -> AgentResult<()> {
        let hash = tx.hash();
        self.known.insert(hash);
        match self.mempool.push_transaction(tx) {
            Ok(_) => trace!(%hash, "Transaction pooled"),
            Err(crate::domain::MempoolError::Duplicate(_)) => {}
            Err(err) => {
                debug!(%hash, %err, "Transaction refused");
                self.send_reject(
                    MessageType::Tx.tag(),
                    err.reject_code(),
                    &err.to_string(),
                    hash.as_bytes().to_vec(),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn on_chain_proof(&mut self, proof: ChainProof) -> AgentResult<()> {
        if self.proof_deadline.take().is_none() {
            debug!("Unsolicited chain proof ignored");
            return Ok(());
        }
        let genesis_hash = self.blockchain.genesis_hash();
        match proof.verify(self.blockchain.policy(), &genesis_hash) {
            Ok(work) => {
                if let Some(head) = proof.head_hash() {
                    self.peer_head = Some(head);
                }
                let local = self.blockchain.total_work();
                if work <= local {
                    info!(work, local, "Peer proves no more work than ours");
                    self.set_established();
                    Ok(())
                } else {
                    info!(work, local, height = proof.head_height(), "Peer proves more work, downloading");
                    self.sync_round().await
                }
            }
            Err(err) if err.is_self_contradictory() => Err(err.into()),
            Err(err) => {
                warn!(%err, "Chain proof discarded");
                self.set_established();
                Ok(())
            }
        }
    }

    // -------------------------------------------------------------------------
    // Serving
    // -------------------------------------------------------------------------

    async fn on_get_blocks(&mut self, request: GetBlocksMessage) -> AgentResult<()> {
        let count = usize::from(request.max_inv_size).min(GETBLOCKS_VECTORS_MAX);
        let direction = match request.direction {
            GetBlocksDirection::Forward => Direction::Forward,
            GetBlocksDirection::Backward => Direction::Backward,
        };
        let hashes = self
            .blockchain
            .blocks_after(request.locators(), count, direction)
            .await?;
        let vectors = hashes
            .into_iter()
            .map(|hash| InvVector::new(InvType::Block, hash))
            .collect();
        let inventory =
            Inventory::new(vectors).map_err(|err| AgentError::Internal(err.to_string()))?;
        // Sent even when empty so the requester can finish its round.
        self.send(Message::Inv(inventory)).await;
        Ok(())
    }

    async fn on_get_data(&mut self, inventory: Inventory) -> AgentResult<()> {
        let mut missing = Vec::new();
        for vector in inventory.into_vectors() {
            match vector.inv_type {
                InvType::Block => match self.blockchain.get_block(&vector.hash, true).await? {
                    Some(block) if block.is_full() => {
                        self.known.insert(vector.hash);
                        self.send(Message::block(block)).await;
                    }
                    _ => missing.push(vector),
                },
                InvType::Transaction => match self.mempool.get(&vector.hash) {
                    Some(tx) => {
                        self.known.insert(vector.hash);
                        self.send(Message::Tx(tx)).await;
                    }
                    None => missing.push(vector),
                },
                InvType::Error => missing.push(vector),
            }
        }
        for chunk in Inventory::chunked(missing) {
            self.send(Message::NotFound(chunk)).await;
        }
        Ok(())
    }

    async fn on_mempool_request(&mut self) -> AgentResult<()> {
        let vectors: Vec<InvVector> = self
            .mempool
            .transactions()
            .iter()
            .filter(|tx| self.subscription.matches_transaction(tx))
            .map(InvVector::from_transaction)
            .collect();
        for vector in &vectors {
            self.known.insert(vector.hash);
        }
        for chunk in Inventory::chunked(vectors) {
            self.send(Message::Inv(chunk)).await;
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Relay
    // -------------------------------------------------------------------------

    async fn on_command(&mut self, command: Command) {
        match command {
            Command::RelayBlock(block) => {
                if self.subscription.matches_block(&block) {
                    self.announce(InvVector::from_block(&block)).await;
                }
            }
            Command::RelayTransaction(tx) => {
                if self.subscription.matches_transaction(&tx) {
                    self.announce(InvVector::from_transaction(&tx)).await;
                }
            }
            Command::Close => self.close(CloseReason::Requested),
        }
    }

    async fn announce(&mut self, vector: InvVector) {
        if self.state() != AgentState::Established || self.known.contains(&vector.hash) {
            return;
        }
        self.known.insert(vector.hash);
        match Inventory::new(vec![vector]) {
            Ok(inventory) => self.send(Message::Inv(inventory)).await,
            Err(err) => error!(%err, "Could not build inventory"),
        }
    }

    // -------------------------------------------------------------------------
    // Timers
    // -------------------------------------------------------------------------

    async fn on_tick(&mut self) {
        let now = Instant::now();
        if let Some(err) = self.expired_request(now) {
            self.on_error(err).await;
            return;
        }
        if self.state() != AgentState::Established || self.ping.outstanding.is_some() {
            return;
        }
        if self.ping.next_at.is_some_and(|at| now >= at) {
            let nonce = rand::random::<u32>();
            self.ping.outstanding = Some((nonce, now + self.config.request_timeout()));
            self.send(Message::Ping(nonce)).await;
        }
    }

    fn expired_request(&self, now: Instant) -> Option<AgentError> {
        if self.handshake_deadline.is_some_and(|deadline| now >= deadline) {
            return Some(AgentError::HandshakeTimeout);
        }
        if self.proof_deadline.is_some_and(|deadline| now >= deadline) {
            return Some(AgentError::RequestTimeout("getchainproof"));
        }
        if let Some(request) = self.sync.expired(now) {
            return Some(AgentError::RequestTimeout(request));
        }
        match self.ping.outstanding {
            Some((_, deadline)) if now >= deadline => Some(AgentError::RequestTimeout("ping")),
            _ => None,
        }
    }

    fn on_pong(&mut self, nonce: u32) {
        if matches!(self.ping.outstanding, Some((expected, _)) if expected == nonce) {
            self.ping.outstanding = None;
            self.ping.next_at = Some(Instant::now() + self.config.ping_interval());
        }
    }
}
