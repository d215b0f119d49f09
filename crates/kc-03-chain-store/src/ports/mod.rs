//! Ports for the chain store.

pub mod outbound;

pub use outbound::{BatchOperation, ChecksumProvider, KVStoreError, KeyValueStore};
