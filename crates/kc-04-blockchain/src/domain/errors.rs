//! # Domain Errors
//!
//! Error types for the blockchain subsystem.

use kc_01_block_model::{BlockError, CompactTarget};
use kc_02_chain_proof::ProofError;
use kc_03_chain_store::StoreError;
use shared_types::{Address, ErrorKind, Hash};
use thiserror::Error;

/// Result type alias for blockchain operations
pub type BlockchainResult<T> = Result<T, BlockchainError>;

/// Account tree rejections.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountsError {
    #[error("Insufficient balance for {address}: has {balance}, needs {needed}")]
    InsufficientBalance {
        address: Address,
        balance: u64,
        needed: u64,
    },

    #[error("Invalid nonce for {address}: expected {expected}, got {got}")]
    InvalidNonce {
        address: Address,
        expected: u32,
        got: u32,
    },

    #[error("Balance of {0} overflows")]
    Overflow(Address),

    #[error("Block {0} has no body")]
    MissingBody(Hash),

    /// Revert of a block that was not the last one applied.
    #[error("Account state does not match block {0}")]
    StateMismatch(Hash),
}

/// Why a block was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReason {
    #[error("{0}")]
    Block(#[from] BlockError),

    #[error("block body missing")]
    MissingBody,

    #[error("not a valid successor of its parent")]
    NotSuccessor,

    #[error("wrong difficulty target: expected {expected}, got {got}")]
    WrongTarget {
        expected: CompactTarget,
        got: CompactTarget,
    },

    #[error("{0}")]
    Accounts(#[from] AccountsError),

    #[error("accounts hash mismatch: header commits to {expected}, state is {actual}")]
    AccountsHashMismatch { expected: Hash, actual: Hash },
}

impl InvalidReason {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Block(err) => err.kind(),
            _ => ErrorKind::InvalidBlock,
        }
    }
}

/// Blockchain error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockchainError {
    /// The block breaks a consensus rule and must not be relayed.
    #[error("Invalid block {hash}: {reason}")]
    InvalidBlock { hash: Hash, reason: InvalidReason },

    /// Valid on its own but the parent is unknown.
    #[error("Orphan block {hash}: parent {parent} unknown")]
    Orphan { hash: Hash, parent: Hash },

    #[error("Chain store error: {0}")]
    Store(#[from] StoreError),

    #[error("Chain proof error: {0}")]
    Proof(#[from] ProofError),

    /// Template transactions do not apply to the current state.
    #[error("Account tree error: {0}")]
    Accounts(#[from] AccountsError),

    /// Template body out of bounds.
    #[error("Invalid block body: {0}")]
    Body(#[from] BlockError),

    /// Stored chain data contradicts itself.
    #[error("Chain state corrupted: {0}")]
    Corrupted(String),
}

impl BlockchainError {
    /// Classify for peer handling.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBlock { reason, .. } => reason.kind(),
            Self::Orphan { .. } => ErrorKind::Orphan,
            Self::Proof(err) => err.kind(),
            Self::Accounts(_) => ErrorKind::InvalidTransaction,
            Self::Body(err) => err.kind(),
            Self::Store(_) | Self::Corrupted(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn corrupted(what: impl Into<String>) -> Self {
        Self::Corrupted(what.into())
    }
}
