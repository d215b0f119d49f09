//! In-memory mempool.

use std::collections::HashMap;

use kc_01_block_model::{Block, Transaction};
use parking_lot::RwLock;
use shared_types::{Address, Hash};
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::MempoolConfig;
use crate::domain::MempoolError;
use crate::ports::outbound::Mempool;

const ACCEPTED_CHANNEL_CAPACITY: usize = 1024;

#[derive(Default)]
struct PoolInner {
    /// Hash -> (admission sequence, transaction)
    by_hash: HashMap<Hash, (u64, Transaction)>,
    by_sender_nonce: HashMap<(Address, u32), Hash>,
    next_seq: u64,
}

impl PoolInner {
    fn admit(&mut self, tx: Transaction, config: &MempoolConfig) -> Result<Hash, MempoolError> {
        let hash = tx.hash();
        if self.by_hash.contains_key(&hash) {
            return Err(MempoolError::Duplicate(hash));
        }
        if tx.fee() < config.min_fee {
            return Err(MempoolError::FeeTooLow {
                fee: tx.fee(),
                min: config.min_fee,
            });
        }
        let slot = (*tx.sender(), tx.nonce());
        if let Some(existing) = self.by_sender_nonce.get(&slot) {
            return Err(MempoolError::NonceConflict {
                nonce: tx.nonce(),
                existing: *existing,
            });
        }
        if self.by_hash.len() >= config.max_transactions {
            return Err(MempoolError::Full {
                capacity: config.max_transactions,
            });
        }
        self.by_sender_nonce.insert(slot, hash);
        self.by_hash.insert(hash, (self.next_seq, tx));
        self.next_seq += 1;
        Ok(hash)
    }

    fn remove(&mut self, hash: &Hash) -> bool {
        match self.by_hash.remove(hash) {
            Some((_, tx)) => {
                self.by_sender_nonce.remove(&(*tx.sender(), tx.nonce()));
                true
            }
            None => false,
        }
    }

    fn sorted(&self) -> Vec<(u64, Transaction)> {
        let mut entries: Vec<_> = self.by_hash.values().cloned().collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries
    }
}

/// Mempool with stateless admission rules: no duplicates, one
/// transaction per sender nonce, a minimum fee and a capacity.
pub struct InMemoryMempool {
    config: MempoolConfig,
    inner: RwLock<PoolInner>,
    accepted: broadcast::Sender<Transaction>,
}

impl Default for InMemoryMempool {
    fn default() -> Self {
        Self::new(MempoolConfig::default())
    }
}

impl InMemoryMempool {
    pub fn new(config: MempoolConfig) -> Self {
        let (accepted, _) = broadcast::channel(ACCEPTED_CHANNEL_CAPACITY);
        Self {
            config,
            inner: RwLock::new(PoolInner::default()),
            accepted,
        }
    }

    /// Transactions admitted through [`Mempool::push_transaction`] from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Transaction> {
        self.accepted.subscribe()
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }
}

impl Mempool for InMemoryMempool {
    fn push_transaction(&self, tx: Transaction) -> Result<Hash, MempoolError> {
        let hash = self.inner.write().admit(tx.clone(), &self.config)?;
        debug!(%hash, fee = tx.fee(), "Transaction admitted");
        // No subscribers is fine.
        let _ = self.accepted.send(tx);
        Ok(hash)
    }

    fn get(&self, hash: &Hash) -> Option<Transaction> {
        self.inner.read().by_hash.get(hash).map(|(_, tx)| tx.clone())
    }

    fn contains(&self, hash: &Hash) -> bool {
        self.inner.read().by_hash.contains_key(hash)
    }

    fn transactions_for_block(&self, max: usize) -> Vec<Transaction> {
        let mut entries = self.inner.read().sorted();
        // Stable sort keeps admission order among equal fees.
        entries.sort_by_key(|(_, tx)| std::cmp::Reverse(tx.fee()));
        let mut taken: Vec<Transaction> = entries.into_iter().map(|(_, tx)| tx).take(max).collect();
        // Nonces of one sender must be applied in order.
        taken.sort_by_key(|tx| (*tx.sender(), tx.nonce()));
        taken
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.inner
            .read()
            .sorted()
            .into_iter()
            .map(|(_, tx)| tx)
            .collect()
    }

    fn evict_applied(&self, block: &Block) -> usize {
        let Some(body) = &block.body else {
            return 0;
        };
        let mut inner = self.inner.write();
        let mut evicted = 0;
        for tx in body.transactions() {
            let slot = (*tx.sender(), tx.nonce());
            let conflicting = inner.by_sender_nonce.get(&slot).copied();
            if let Some(hash) = conflicting {
                if inner.remove(&hash) {
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            debug!(block = %block.hash(), evicted, "Evicted mined transactions");
        }
        evicted
    }

    fn restore_reverted(&self, block: &Block) -> usize {
        let Some(body) = &block.body else {
            return 0;
        };
        let mut inner = self.inner.write();
        body.transactions()
            .iter()
            .filter(|tx| inner.admit((*tx).clone(), &self.config).is_ok())
            .count()
    }

    fn len(&self) -> usize {
        self.inner.read().by_hash.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_01_block_model::test_utils::{genesis_block, mine_block};
    use kc_01_block_model::{Body, ConsensusPolicy};

    fn tx(sender: u8, nonce: u32, fee: u64) -> Transaction {
        Transaction::new(Address([sender; 20]), Address([0xEE; 20]), 10, fee, nonce, vec![]).unwrap()
    }

    fn block_with(transactions: Vec<Transaction>) -> Block {
        let policy = ConsensusPolicy::for_testing();
        let genesis = genesis_block(&policy);
        let body = Body::new(Address([0xAA; 20]), vec![], transactions).unwrap();
        mine_block(&policy, &genesis, Some(body), Hash::ZERO)
    }

    #[test]
    fn test_admission_rules() {
        let pool = InMemoryMempool::new(MempoolConfig {
            max_transactions: 2,
            min_fee: 1,
        });
        let first = tx(1, 0, 5);
        assert_eq!(pool.push_transaction(first.clone()), Ok(first.hash()));
        assert_eq!(
            pool.push_transaction(first.clone()),
            Err(MempoolError::Duplicate(first.hash()))
        );
        assert!(matches!(
            pool.push_transaction(tx(2, 0, 0)),
            Err(MempoolError::FeeTooLow { fee: 0, min: 1 })
        ));
        assert!(matches!(
            pool.push_transaction(tx(1, 0, 9)),
            Err(MempoolError::NonceConflict { nonce: 0, .. })
        ));
        pool.push_transaction(tx(2, 0, 1)).unwrap();
        assert!(matches!(
            pool.push_transaction(tx(3, 0, 1)),
            Err(MempoolError::Full { capacity: 2 })
        ));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_block_selection_by_fee() {
        let pool = InMemoryMempool::new(MempoolConfig::for_testing());
        pool.push_transaction(tx(1, 0, 1)).unwrap();
        pool.push_transaction(tx(2, 0, 7)).unwrap();
        pool.push_transaction(tx(3, 0, 3)).unwrap();
        let mut fees: Vec<u64> = pool
            .transactions_for_block(2)
            .iter()
            .map(Transaction::fee)
            .collect();
        fees.sort_unstable();
        assert_eq!(fees, vec![3, 7]);
        assert_eq!(pool.transactions().len(), 3);
        assert_eq!(pool.transactions()[0].fee(), 1);
    }

    #[test]
    fn test_evict_and_restore() {
        let pool = InMemoryMempool::new(MempoolConfig::for_testing());
        let mined = tx(1, 0, 2);
        let conflicting = tx(2, 4, 2);
        let unrelated = tx(3, 0, 2);
        pool.push_transaction(mined.clone()).unwrap();
        pool.push_transaction(conflicting).unwrap();
        pool.push_transaction(unrelated.clone()).unwrap();

        // Same sender and nonce as a pooled transaction, different value.
        let rival =
            Transaction::new(Address([2; 20]), Address([0xEE; 20]), 99, 2, 4, vec![]).unwrap();
        let block = block_with(vec![mined.clone(), rival]);

        assert_eq!(pool.evict_applied(&block), 2);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(&unrelated.hash()));

        assert_eq!(pool.restore_reverted(&block), 2);
        assert!(pool.contains(&mined.hash()));
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_light_block_is_ignored() {
        let pool = InMemoryMempool::new(MempoolConfig::for_testing());
        pool.push_transaction(tx(1, 0, 1)).unwrap();
        let block = block_with(vec![tx(1, 0, 1)]).to_light();
        assert_eq!(pool.evict_applied(&block), 0);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn test_admissions_are_broadcast() {
        let pool = InMemoryMempool::new(MempoolConfig::for_testing());
        let mut accepted = pool.subscribe();
        let transaction = tx(1, 0, 1);
        pool.push_transaction(transaction.clone()).unwrap();
        assert_eq!(accepted.recv().await.unwrap(), transaction);
    }
}
