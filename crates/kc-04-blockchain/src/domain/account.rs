//! Account state as seen by the chain.

use serde::{Deserialize, Serialize};

/// Balance and transaction counter of one address.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: u64,
    /// Nonce the next transaction from this account must carry
    pub nonce: u32,
}

impl Account {
    /// An untouched account. Empty accounts are not stored.
    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.nonce == 0
    }
}
