//! Per-peer memory of inventory the peer already has.

use std::num::NonZeroUsize;

use lru::LruCache;
use shared_types::Hash;

/// Bounded set of hashes; the least recently seen entry is forgotten first.
pub struct KnownInventory {
    cache: LruCache<Hash, ()>,
}

impl KnownInventory {
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            cache: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
        }
    }

    /// Remember `hash`. Returns `true` if it was not known yet.
    pub fn insert(&mut self, hash: Hash) -> bool {
        self.cache.put(hash, ()).is_none()
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.cache.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
