//! # Outbound Ports
//!
//! Dependencies the blockchain calls out to.

use kc_01_block_model::{Block, Body};
use shared_types::{Address, Hash};

use crate::domain::{Account, AccountsError, ChainEvent};

/// Account state tree - outbound port.
///
/// `apply` and `revert` are all-or-nothing: a rejected call leaves the tree
/// exactly as it was.
pub trait AccountTree: Send + Sync {
    /// Apply a full block, returning the new root.
    fn apply(&mut self, block: &Block) -> Result<Hash, AccountsError>;

    /// Undo the most recently applied block, returning the previous root.
    fn revert(&mut self, block: &Block) -> Result<Hash, AccountsError>;

    /// Current root.
    fn root(&self) -> Hash;

    /// Account state of `address`; untouched addresses are empty.
    fn account(&self, address: &Address) -> Account;

    /// Root the tree would have after applying `body`, without applying it.
    fn compute_state_root(&self, body: &Body) -> Result<Hash, AccountsError>;
}

/// Chain event sink - outbound port.
///
/// Called synchronously with the chain locked; implementations must not
/// block.
pub trait ChainListener: Send + Sync {
    fn on_event(&self, event: &ChainEvent);
}

impl<F> ChainListener for F
where
    F: Fn(&ChainEvent) + Send + Sync,
{
    fn on_event(&self, event: &ChainEvent) {
        self(event)
    }
}
