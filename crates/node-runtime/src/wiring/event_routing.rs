//! # Event Routing
//!
//! Connects the chain and the mempool to the agents.
//!
//! ```text
//! Blockchain ──HeadChanged──→ ChainRelay ──┬──→ mempool: restore reverted, evict applied
//!                                          └──→ every agent: relay applied blocks
//!
//! Mempool ──accepted tx──→ transaction relay task ──→ every agent: relay tx
//! ```
//!
//! [`ChainRelay`] runs inside the chain's listener callback, so it only does
//! non-blocking work: mempool bookkeeping and queueing relay commands.

use std::sync::Arc;

use kc_01_block_model::Transaction;
use kc_04_blockchain::{ChainEvent, ChainListener};
use kc_06_consensus_agent::{InMemoryMempool, Mempool};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::registry::AgentRegistry;

/// Chain listener keeping the mempool and the peers in step with the head.
pub struct ChainRelay {
    mempool: Arc<InMemoryMempool>,
    agents: Arc<AgentRegistry>,
}

impl ChainRelay {
    pub fn new(mempool: Arc<InMemoryMempool>, agents: Arc<AgentRegistry>) -> Self {
        Self { mempool, agents }
    }
}

impl ChainListener for ChainRelay {
    fn on_event(&self, event: &ChainEvent) {
        match event {
            ChainEvent::HeadChanged {
                head,
                applied,
                reverted,
            } => {
                // Reverted first: a transaction may be re-included by the
                // new branch.
                let restored: usize = reverted
                    .iter()
                    .map(|block| self.mempool.restore_reverted(block))
                    .sum();
                let evicted: usize = applied
                    .iter()
                    .map(|block| self.mempool.evict_applied(block))
                    .sum();
                let mut relayed = 0;
                for block in applied {
                    relayed += self
                        .agents
                        .for_each_relay(|agent| agent.relay_block(block));
                }
                debug!(
                    head = %head.hash(),
                    height = head.height(),
                    applied = applied.len(),
                    reverted = reverted.len(),
                    restored,
                    evicted,
                    relayed,
                    "Head changed"
                );
            }
            ChainEvent::BlockRejected { hash, reason } => {
                debug!(%hash, %reason, "Block rejected");
            }
        }
    }
}

/// Relay every transaction the mempool accepts until shutdown.
pub fn spawn_transaction_relay(
    mut accepted: broadcast::Receiver<Transaction>,
    agents: Arc<AgentRegistry>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                received = accepted.recv() => match received {
                    Ok(tx) => {
                        let relayed = agents.for_each_relay(|agent| agent.relay_transaction(&tx));
                        debug!(hash = %tx.hash(), relayed, "Transaction relayed");
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Transaction relay fell behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Transaction relay stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_01_block_model::Body;
    use kc_04_blockchain::test_utils::{extend, funded_blockchain, mine_next_with, test_blockchain};
    use kc_06_consensus_agent::MempoolConfig;
    use shared_types::Address;

    #[tokio::test]
    async fn test_applied_transactions_leave_the_mempool() {
        let alice = Address([1; 20]);
        let chain = Arc::new(funded_blockchain([(alice, 1_000)]));
        let mempool = Arc::new(InMemoryMempool::new(MempoolConfig::for_testing()));
        chain.subscribe(Arc::new(ChainRelay::new(
            Arc::clone(&mempool),
            Arc::new(AgentRegistry::new()),
        )));

        let included = Transaction::new(alice, Address([2; 20]), 5, 1, 0, vec![]).unwrap();
        let waiting = Transaction::new(Address([3; 20]), Address([2; 20]), 5, 1, 0, vec![]).unwrap();
        mempool.push_transaction(included.clone()).unwrap();
        mempool.push_transaction(waiting.clone()).unwrap();

        let body = Body::new(Address([9; 20]), vec![], vec![included.clone()]).unwrap();
        let block = mine_next_with(&chain, body).await;
        chain.push_block(block).await.unwrap();

        assert!(!mempool.contains(&included.hash()));
        assert!(mempool.contains(&waiting.hash()));
    }

    #[tokio::test]
    async fn test_empty_blocks_leave_the_mempool_alone() {
        let chain = Arc::new(test_blockchain());
        let mempool = Arc::new(InMemoryMempool::new(MempoolConfig::for_testing()));
        chain.subscribe(Arc::new(ChainRelay::new(
            Arc::clone(&mempool),
            Arc::new(AgentRegistry::new()),
        )));
        let tx = Transaction::new(Address([1; 20]), Address([2; 20]), 5, 1, 0, vec![]).unwrap();
        mempool.push_transaction(tx.clone()).unwrap();
        extend(&chain, 2, Address([9; 20])).await;
        assert!(mempool.contains(&tx.hash()));
        assert_eq!(chain.height(), 3);
    }

    #[tokio::test]
    async fn test_transaction_relay_stops_on_shutdown() {
        let mempool = InMemoryMempool::new(MempoolConfig::for_testing());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = spawn_transaction_relay(
            mempool.subscribe(),
            Arc::new(AgentRegistry::new()),
            shutdown_rx,
        );
        let tx = Transaction::new(Address([1; 20]), Address([2; 20]), 5, 1, 0, vec![]).unwrap();
        mempool.push_transaction(tx).unwrap();
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
