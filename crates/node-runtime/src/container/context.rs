//! # Node Context
//!
//! Explicit container for everything a running node shares between its
//! connections: the chain, the mempool, the ban list and the agent registry.
//! No globals; tests build as many contexts as they need in one process.
//!
//! ## Lifecycle
//!
//! 1. [`NodeContext::new`] derives genesis and opens the chain
//! 2. [`NodeContext::start`] spawns the transaction relay
//! 3. [`NodeContext::connect`] runs an agent per peer channel
//! 4. [`NodeContext::shutdown`] stops agents and background tasks

use std::sync::Arc;

use kc_01_block_model::{Block, BlockError};
use kc_04_blockchain::{Blockchain, BlockchainApi, BlockchainError};
use kc_06_consensus_agent::{
    AgentHandle, BanList, CloseReason, ConsensusAgent, InMemoryMempool, PeerChannel,
};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use super::config::NodeConfig;
use crate::genesis::build_genesis;
use crate::registry::AgentRegistry;
use crate::wiring::{spawn_transaction_relay, ChainRelay};

/// Node startup errors.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Invalid genesis configuration: {0}")]
    Genesis(#[from] BlockError),

    #[error("Failed to open blockchain: {0}")]
    Blockchain(#[from] BlockchainError),
}

/// Shared state of one node.
pub struct NodeContext {
    config: NodeConfig,
    blockchain: Arc<Blockchain>,
    mempool: Arc<InMemoryMempool>,
    bans: Arc<BanList>,
    agents: Arc<AgentRegistry>,
    shutdown: watch::Sender<bool>,
}

impl NodeContext {
    /// Build the context with the genesis block described by the config.
    pub fn new(config: NodeConfig) -> Result<Self, NodeError> {
        let genesis = build_genesis(&config.blockchain.policy, &config.genesis)?;
        Self::with_genesis(config, genesis)
    }

    /// Build the context on an explicit genesis block.
    pub fn with_genesis(config: NodeConfig, genesis: Block) -> Result<Self, NodeError> {
        let blockchain = Arc::new(Blockchain::in_memory(config.blockchain.clone(), genesis)?);
        let mempool = Arc::new(InMemoryMempool::new(config.mempool.clone()));
        let agents = Arc::new(AgentRegistry::new());
        blockchain.subscribe(Arc::new(ChainRelay::new(
            Arc::clone(&mempool),
            Arc::clone(&agents),
        )));
        let (shutdown, _) = watch::channel(false);

        info!(
            node = %config.identity.name,
            genesis = %blockchain.genesis_hash(),
            head = %blockchain.head_hash(),
            height = blockchain.height(),
            "Node context ready"
        );
        Ok(Self {
            config,
            blockchain,
            mempool,
            bans: Arc::new(BanList::new()),
            agents,
            shutdown,
        })
    }

    /// Spawn background tasks. Must run inside a tokio runtime.
    pub fn start(&self) -> JoinHandle<()> {
        spawn_transaction_relay(
            self.mempool.subscribe(),
            Arc::clone(&self.agents),
            self.shutdown.subscribe(),
        )
    }

    /// Run a consensus agent over `channel` until the connection closes.
    ///
    /// The agent is registered for relay while it runs.
    pub fn connect<C>(&self, channel: C) -> (AgentHandle, JoinHandle<CloseReason>)
    where
        C: PeerChannel + Sync + 'static,
    {
        let (agent, handle) = ConsensusAgent::new(
            self.config.agent.clone(),
            channel,
            Arc::clone(&self.blockchain) as Arc<dyn BlockchainApi>,
            Arc::clone(&self.mempool),
            Arc::clone(&self.bans),
            self.shutdown.subscribe(),
        );
        let id = self.agents.register(handle.clone());
        let agents = Arc::clone(&self.agents);
        let span = tracing::info_span!("node", name = %self.config.identity.name);
        let task = tokio::spawn(
            async move {
                let reason = agent.run().await;
                agents.unregister(id);
                reason
            }
            .instrument(span),
        );
        (handle, task)
    }

    /// Signal shutdown to every agent and background task.
    pub fn shutdown(&self) {
        info!(node = %self.config.identity.name, agents = self.agents.len(), "Shutting down");
        self.shutdown.send_replace(true);
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn blockchain(&self) -> &Arc<Blockchain> {
        &self.blockchain
    }

    pub fn mempool(&self) -> &Arc<InMemoryMempool> {
        &self.mempool
    }

    pub fn bans(&self) -> &Arc<BanList> {
        &self.bans
    }

    pub fn agents(&self) -> &Arc<AgentRegistry> {
        &self.agents
    }
}
