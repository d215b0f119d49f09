//! # In-Memory Account Tree
//!
//! Balances and nonces in a sorted map. The root hashes every non-empty
//! account in address order, so applying and reverting a block restores the
//! previous root bit for bit.

use std::collections::BTreeMap;

use kc_01_block_model::{Block, Body};
use shared_types::{Address, FixedBytes, Hash};

use crate::domain::{Account, AccountsError};
use crate::ports::outbound::AccountTree;

/// Account tree backed by a `BTreeMap`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountTree {
    accounts: BTreeMap<Address, Account>,
    block_reward: u64,
}

impl InMemoryAccountTree {
    pub fn new(block_reward: u64) -> Self {
        Self {
            accounts: BTreeMap::new(),
            block_reward,
        }
    }

    /// Tree pre-funded with initial balances.
    pub fn with_balances(
        block_reward: u64,
        balances: impl IntoIterator<Item = (Address, u64)>,
    ) -> Self {
        let mut tree = Self::new(block_reward);
        for (address, balance) in balances {
            tree.accounts.insert(address, Account { balance, nonce: 0 });
        }
        tree.prune();
        tree
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    fn get(&self, address: &Address) -> Account {
        self.accounts.get(address).copied().unwrap_or_default()
    }

    fn credit(&mut self, address: &Address, amount: u64) -> Result<(), AccountsError> {
        let mut account = self.get(address);
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(AccountsError::Overflow(*address))?;
        self.accounts.insert(*address, account);
        Ok(())
    }

    fn debit(&mut self, address: &Address, amount: u64, block: &Hash) -> Result<(), AccountsError> {
        let mut account = self.get(address);
        account.balance = account
            .balance
            .checked_sub(amount)
            .ok_or(AccountsError::StateMismatch(*block))?;
        self.accounts.insert(*address, account);
        Ok(())
    }

    fn apply_body(&mut self, body: &Body) -> Result<(), AccountsError> {
        for tx in body.transactions() {
            let sender = self.get(tx.sender());
            if sender.nonce != tx.nonce() {
                return Err(AccountsError::InvalidNonce {
                    address: *tx.sender(),
                    expected: sender.nonce,
                    got: tx.nonce(),
                });
            }
            let cost = tx.total_cost();
            if sender.balance < cost {
                return Err(AccountsError::InsufficientBalance {
                    address: *tx.sender(),
                    balance: sender.balance,
                    needed: cost,
                });
            }
            let nonce = sender
                .nonce
                .checked_add(1)
                .ok_or(AccountsError::Overflow(*tx.sender()))?;
            self.accounts.insert(
                *tx.sender(),
                Account {
                    balance: sender.balance - cost,
                    nonce,
                },
            );
            self.credit(tx.recipient(), tx.value())?;
        }

        let reward = self
            .block_reward
            .checked_add(body.total_fees())
            .ok_or(AccountsError::Overflow(*body.miner_address()))?;
        self.credit(body.miner_address(), reward)
    }

    fn revert_body(&mut self, body: &Body, block: &Hash) -> Result<(), AccountsError> {
        let reward = self.block_reward.saturating_add(body.total_fees());
        self.debit(body.miner_address(), reward, block)?;

        for tx in body.transactions().iter().rev() {
            self.debit(tx.recipient(), tx.value(), block)?;
            let sender = self.get(tx.sender());
            if sender.nonce != tx.nonce().wrapping_add(1) {
                return Err(AccountsError::StateMismatch(*block));
            }
            let balance = sender
                .balance
                .checked_add(tx.total_cost())
                .ok_or(AccountsError::Overflow(*tx.sender()))?;
            self.accounts.insert(
                *tx.sender(),
                Account {
                    balance,
                    nonce: tx.nonce(),
                },
            );
        }
        Ok(())
    }

    fn prune(&mut self) {
        self.accounts.retain(|_, account| !account.is_empty());
    }

    fn body_of(block: &Block) -> Result<&Body, AccountsError> {
        block
            .body
            .as_ref()
            .ok_or_else(|| AccountsError::MissingBody(block.hash()))
    }
}

impl AccountTree for InMemoryAccountTree {
    fn apply(&mut self, block: &Block) -> Result<Hash, AccountsError> {
        let body = Self::body_of(block)?;
        let mut next = self.clone();
        next.apply_body(body)?;
        next.prune();
        *self = next;
        Ok(self.root())
    }

    fn revert(&mut self, block: &Block) -> Result<Hash, AccountsError> {
        let body = Self::body_of(block)?;
        let mut next = self.clone();
        next.revert_body(body, &block.hash())?;
        next.prune();
        *self = next;
        Ok(self.root())
    }

    fn root(&self) -> Hash {
        let mut bytes = Vec::with_capacity(self.accounts.len() * (Address::LEN + 12));
        for (address, account) in &self.accounts {
            bytes.extend_from_slice(address.as_bytes());
            bytes.extend_from_slice(&account.balance.to_be_bytes());
            bytes.extend_from_slice(&account.nonce.to_be_bytes());
        }
        Hash::digest(&bytes)
    }

    fn account(&self, address: &Address) -> Account {
        self.get(address)
    }

    fn compute_state_root(&self, body: &Body) -> Result<Hash, AccountsError> {
        let mut next = self.clone();
        next.apply_body(body)?;
        next.prune();
        Ok(next.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kc_01_block_model::test_utils::{empty_body, genesis_block, mine_block};
    use kc_01_block_model::{ConsensusPolicy, Transaction};

    const ALICE: Address = Address([1; 20]);
    const BOB: Address = Address([2; 20]);
    const MINER: Address = Address([9; 20]);

    fn block_with(transactions: Vec<Transaction>) -> Block {
        let policy = ConsensusPolicy::for_testing();
        let body = Body::new(MINER, vec![], transactions).unwrap();
        mine_block(&policy, &genesis_block(&policy), Some(body), Hash::ZERO)
    }

    fn transfer(value: u64, fee: u64, nonce: u32) -> Transaction {
        Transaction::new(ALICE, BOB, value, fee, nonce, vec![]).unwrap()
    }

    #[test]
    fn test_empty_root_is_digest_of_nothing() {
        assert_eq!(InMemoryAccountTree::new(10).root(), Hash::digest(&[]));
    }

    #[test]
    fn test_apply_credits_reward_and_fees() {
        let mut tree = InMemoryAccountTree::with_balances(10, [(ALICE, 100)]);
        tree.apply(&block_with(vec![transfer(30, 5, 0)])).unwrap();

        assert_eq!(tree.account(&ALICE), Account { balance: 65, nonce: 1 });
        assert_eq!(tree.account(&BOB).balance, 30);
        assert_eq!(tree.account(&MINER).balance, 15);
    }

    #[test]
    fn test_apply_then_revert_restores_root() {
        let mut tree = InMemoryAccountTree::with_balances(10, [(ALICE, 100)]);
        let before = tree.root();
        let first = block_with(vec![transfer(30, 5, 0)]);
        let second = block_with(vec![transfer(10, 1, 1)]);

        tree.apply(&first).unwrap();
        tree.apply(&second).unwrap();
        tree.revert(&second).unwrap();
        tree.revert(&first).unwrap();

        assert_eq!(tree.root(), before);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_rejected_apply_leaves_state_untouched() {
        let mut tree = InMemoryAccountTree::with_balances(10, [(ALICE, 100)]);
        let before = tree.root();
        // Second transfer overdraws.
        let block = block_with(vec![transfer(50, 0, 0), transfer(60, 0, 1)]);
        assert!(matches!(
            tree.apply(&block),
            Err(AccountsError::InsufficientBalance { .. })
        ));
        assert_eq!(tree.root(), before);
    }

    #[test]
    fn test_nonce_must_match() {
        let mut tree = InMemoryAccountTree::with_balances(10, [(ALICE, 100)]);
        let block = block_with(vec![transfer(1, 0, 3)]);
        assert_eq!(
            tree.apply(&block),
            Err(AccountsError::InvalidNonce {
                address: ALICE,
                expected: 0,
                got: 3
            })
        );
    }

    #[test]
    fn test_compute_state_root_does_not_mutate() {
        let tree = InMemoryAccountTree::new(10);
        let before = tree.root();
        let root = tree.compute_state_root(&empty_body(MINER)).unwrap();
        assert_ne!(root, before);
        assert_eq!(tree.root(), before);

        let mut applied = tree.clone();
        let block = block_with(vec![]);
        assert_eq!(applied.apply(&block).unwrap(), root);
    }

    #[test]
    fn test_light_block_rejected() {
        let mut tree = InMemoryAccountTree::new(10);
        let block = block_with(vec![]).to_light();
        assert!(matches!(
            tree.apply(&block),
            Err(AccountsError::MissingBody(_))
        ));
    }
}
