//! In-process adapters for the chain store ports.

pub mod checksum;
pub mod memory;

pub use checksum::DefaultChecksumProvider;
pub use memory::InMemoryKVStore;
