//! # Domain Errors
//!
//! Error types for the chain store.

use shared_types::{CodecError, Hash};
use thiserror::Error;

use crate::ports::outbound::KVStoreError;

/// Result type alias for chain store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend failure.
    #[error("Key-value store error: {0}")]
    Backend(#[from] KVStoreError),

    /// Checksum mismatch detected.
    #[error("Data corruption for {hash}: expected checksum {expected:#010x}, got {actual:#010x}")]
    DataCorruption {
        hash: Hash,
        expected: u32,
        actual: u32,
    },

    /// Stored bytes do not decode.
    #[error("Stored record for {hash} does not decode: {source}")]
    Decode { hash: Hash, source: CodecError },
}
