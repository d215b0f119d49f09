//! # Chain Store (Subsystem 03)
//!
//! Index of every known chain record (main chain and forks), keyed by the
//! hash of the record's head block.
//!
//! ## Records
//!
//! A [`Chain`] record is stored per block: the block itself, the total
//! work of the chain ending there, and whether it is on the main chain.
//! Unknown hashes read back as `None`; absence is a normal answer, not an
//! error.
//!
//! ## Maximum work
//!
//! The record with the most total work is cached on every `put`. Deleting
//! the cached record marks the cache stale; the next
//! [`BlockchainStore::get_max`] rescans once.
//!
//! ## Data Integrity
//!
//! Records are stored as `crc32 || encoded chain`; a checksum mismatch on
//! read surfaces as [`StoreError::DataCorruption`].

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{DefaultChecksumProvider, InMemoryKVStore};
pub use domain::{Chain, StoreError, StoreResult};
pub use ports::{BatchOperation, ChecksumProvider, KVStoreError, KeyValueStore};
pub use service::BlockchainStore;
