//! # Blockchain Store Service
//!
//! Chain records and the main-chain height index on top of any
//! [`KeyValueStore`].
//!
//! ## Key layout
//!
//! | Prefix | Key | Value |
//! |--------|-----|-------|
//! | `c:` | head hash | `crc32 \|\| Chain` |
//! | `h:` | height (u32 BE) | main-chain block hash |

use shared_types::{Decode, Encode, FixedBytes, Hash};
use tracing::{debug, error};

use crate::adapters::{DefaultChecksumProvider, InMemoryKVStore};
use crate::domain::{Chain, StoreError, StoreResult};
use crate::ports::outbound::{BatchOperation, ChecksumProvider, KeyValueStore};

const CHAIN_PREFIX: &[u8] = b"c:";
const HEIGHT_PREFIX: &[u8] = b"h:";

fn chain_key(hash: &Hash) -> Vec<u8> {
    [CHAIN_PREFIX, hash.as_bytes()].concat()
}

fn height_key(height: u32) -> Vec<u8> {
    [HEIGHT_PREFIX, &height.to_be_bytes()[..]].concat()
}

/// Index of chain records with a cached maximum-work lookup.
pub struct BlockchainStore<S = InMemoryKVStore, C = DefaultChecksumProvider>
where
    S: KeyValueStore,
    C: ChecksumProvider,
{
    kv: S,
    checksum: C,
    /// Hash and work of the heaviest record, valid unless `max_stale`.
    max: Option<(Hash, u64)>,
    max_stale: bool,
}

impl BlockchainStore<InMemoryKVStore, DefaultChecksumProvider> {
    /// Volatile store.
    pub fn in_memory() -> Self {
        Self::new(InMemoryKVStore::new(), DefaultChecksumProvider)
    }
}

impl<S, C> BlockchainStore<S, C>
where
    S: KeyValueStore,
    C: ChecksumProvider,
{
    /// Wrap a backend. Existing records are picked up by the first
    /// [`get_max`](Self::get_max).
    pub fn new(kv: S, checksum: C) -> Self {
        Self {
            kv,
            checksum,
            max: None,
            max_stale: true,
        }
    }

    fn frame(&self, chain: &Chain) -> Vec<u8> {
        let body = chain.to_bytes();
        let mut value = Vec::with_capacity(4 + body.len());
        value.extend_from_slice(&self.checksum.compute_crc32(&body).to_be_bytes());
        value.extend_from_slice(&body);
        value
    }

    fn unframe(&self, hash: &Hash, value: &[u8]) -> StoreResult<Chain> {
        if value.len() < 4 {
            return Err(StoreError::DataCorruption {
                hash: *hash,
                expected: 0,
                actual: 0,
            });
        }
        let (stored, body) = value.split_at(4);
        let expected = u32::from_be_bytes([stored[0], stored[1], stored[2], stored[3]]);
        if !self.checksum.verify_crc32(body, expected) {
            let actual = self.checksum.compute_crc32(body);
            error!(%hash, expected, actual, "Chain record checksum mismatch");
            return Err(StoreError::DataCorruption {
                hash: *hash,
                expected,
                actual,
            });
        }
        Chain::from_bytes(body).map_err(|source| StoreError::Decode {
            hash: *hash,
            source,
        })
    }

    /// Record by head hash. `Ok(None)` for an unknown hash.
    pub fn get(&self, hash: &Hash) -> StoreResult<Option<Chain>> {
        match self.kv.get(&chain_key(hash))? {
            Some(value) => self.unframe(hash, &value).map(Some),
            None => Ok(None),
        }
    }

    /// Whether a record exists for `hash`.
    pub fn contains(&self, hash: &Hash) -> StoreResult<bool> {
        Ok(self.kv.get(&chain_key(hash))?.is_some())
    }

    fn note_put(&mut self, chain: &Chain) {
        if self.max_stale {
            return;
        }
        let hash = chain.hash();
        match self.max {
            Some((max_hash, _)) if max_hash == hash => {
                self.max = Some((hash, chain.total_work));
            }
            Some((_, max_work)) if chain.total_work <= max_work => {}
            _ => self.max = Some((hash, chain.total_work)),
        }
    }

    /// Insert or replace a record.
    pub fn put(&mut self, chain: &Chain) -> StoreResult<()> {
        let value = self.frame(chain);
        self.kv.put(&chain_key(&chain.hash()), &value)?;
        self.note_put(chain);
        Ok(())
    }

    /// Insert or replace several records atomically.
    pub fn put_all(&mut self, chains: &[Chain]) -> StoreResult<()> {
        let operations = chains
            .iter()
            .map(|chain| BatchOperation::put(chain_key(&chain.hash()), self.frame(chain)))
            .collect();
        self.kv.atomic_batch_write(operations)?;
        for chain in chains {
            self.note_put(chain);
        }
        Ok(())
    }

    /// Remove a record. Removing the cached maximum invalidates the cache.
    pub fn delete(&mut self, hash: &Hash) -> StoreResult<()> {
        self.kv.delete(&chain_key(hash))?;
        if matches!(self.max, Some((max_hash, _)) if max_hash == *hash) {
            self.max = None;
            self.max_stale = true;
        }
        Ok(())
    }

    /// Record with the most total work. Ties go to the main chain, then to
    /// the lower hash.
    pub fn get_max(&mut self) -> StoreResult<Option<Chain>> {
        if self.max_stale {
            self.recompute_max()?;
        }
        match self.max {
            Some((hash, _)) => self.get(&hash),
            None => Ok(None),
        }
    }

    fn recompute_max(&mut self) -> StoreResult<()> {
        let mut best: Option<Chain> = None;
        for (key, value) in self.kv.prefix_scan(CHAIN_PREFIX)? {
            let hash = Hash::from_slice(&key[CHAIN_PREFIX.len()..]).unwrap_or_default();
            let chain = self.unframe(&hash, &value)?;
            let better = match &best {
                None => true,
                Some(current) => {
                    (chain.total_work, chain.on_main_chain, std::cmp::Reverse(hash))
                        > (
                            current.total_work,
                            current.on_main_chain,
                            std::cmp::Reverse(current.hash()),
                        )
                }
            };
            if better {
                best = Some(chain);
            }
        }
        self.max = best.map(|chain| (chain.hash(), chain.total_work));
        self.max_stale = false;
        debug!(max = ?self.max, "Recomputed maximum-work chain");
        Ok(())
    }

    /// Record the main-chain block at `height`.
    pub fn set_main_at(&mut self, height: u32, hash: &Hash) -> StoreResult<()> {
        self.kv.put(&height_key(height), hash.as_bytes())?;
        Ok(())
    }

    /// Main-chain block hash at `height`.
    pub fn main_at(&self, height: u32) -> StoreResult<Option<Hash>> {
        Ok(self
            .kv
            .get(&height_key(height))?
            .and_then(|bytes| Hash::from_slice(&bytes)))
    }

    /// Forget the main-chain entry at `height`.
    pub fn remove_main_at(&mut self, height: u32) -> StoreResult<()> {
        self.kv.delete(&height_key(height))?;
        Ok(())
    }

    /// Number of stored chain records.
    pub fn record_count(&self) -> StoreResult<usize> {
        Ok(self.kv.prefix_scan(CHAIN_PREFIX)?.len())
    }

    /// Backend access.
    pub fn backend(&self) -> &S {
        &self.kv
    }

    /// Mutable backend access.
    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.kv
    }
}
