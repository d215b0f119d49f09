//! Block interlink
//!
//! Entry `i` of a block's interlink is the hash of the most recent ancestor
//! whose superblock level is at least `i`. A verifier holding an ancestor
//! can therefore jump straight to any descendant that references it.
//!
//! ## Wire format
//!
//! ```text
//! count: u8 | repeat_bits: ceil(count / 8) bytes | compressed hashes
//! ```
//!
//! Consecutive entries are frequently equal, so an entry that repeats its
//! predecessor (entry 0 is compared against the header's `prev_hash`) is not
//! written; its bit in `repeat_bits` is set instead, MSB first.

use serde::{Deserialize, Serialize};
use shared_types::{CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter};

use crate::error::{BlockError, BlockResult};

/// Maximum number of interlink entries
pub const INTERLINK_MAX: usize = u8::MAX as usize;

/// Superblock back-references of a block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interlink {
    hashes: Vec<Hash>,
}

impl Interlink {
    pub fn new(hashes: Vec<Hash>) -> BlockResult<Self> {
        if hashes.len() > INTERLINK_MAX {
            return Err(BlockError::FieldTooLong {
                field: "interlink",
                len: hashes.len(),
                max: INTERLINK_MAX,
            });
        }
        Ok(Self { hashes })
    }

    /// Interlink of a genesis block.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn hashes(&self) -> &[Hash] {
        &self.hashes
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Index of the first entry equal to `hash`.
    pub fn position(&self, hash: &Hash) -> Option<usize> {
        self.hashes.iter().position(|h| h == hash)
    }

    /// Interlink of the successor of a block with this interlink, the given
    /// hash and superblock level.
    pub fn successor(&self, block_hash: Hash, level: u32) -> Self {
        let occurrences = (level as usize + 1).min(INTERLINK_MAX);
        let mut hashes = vec![block_hash; occurrences];
        hashes.extend(self.hashes.iter().skip(occurrences).copied());
        hashes.truncate(INTERLINK_MAX);
        Self { hashes }
    }

    fn repeat_bits(&self, prev_hash: &Hash) -> Vec<u8> {
        let mut bits = vec![0u8; self.hashes.len().div_ceil(8)];
        let mut previous = prev_hash;
        for (i, hash) in self.hashes.iter().enumerate() {
            if hash == previous {
                bits[i / 8] |= 0x80 >> (i % 8);
            }
            previous = hash;
        }
        bits
    }

    /// Encode relative to the owning header's `prev_hash`.
    pub fn encode_with(&self, writer: &mut SerialWriter, prev_hash: &Hash) {
        let bits = self.repeat_bits(prev_hash);
        writer.write_u8(self.hashes.len() as u8);
        writer.write_bytes(&bits);
        for (i, hash) in self.hashes.iter().enumerate() {
            if bits[i / 8] & (0x80 >> (i % 8)) == 0 {
                hash.encode(writer);
            }
        }
    }

    /// Decode relative to the owning header's `prev_hash`.
    pub fn decode_with(reader: &mut SerialReader<'_>, prev_hash: &Hash) -> CodecResult<Self> {
        let count = reader.read_u8()? as usize;
        let bits = reader.read_bytes(count.div_ceil(8))?;
        let mut hashes: Vec<Hash> = Vec::with_capacity(count);
        for i in 0..count {
            if bits[i / 8] & (0x80 >> (i % 8)) != 0 {
                let previous = hashes.last().copied().unwrap_or(*prev_hash);
                hashes.push(previous);
            } else {
                hashes.push(Hash::decode(reader)?);
            }
        }
        if count % 8 != 0 && bits[count / 8] & (0xFF >> (count % 8)) != 0 {
            return Err(CodecError::invalid("interlink", "padding bits set"));
        }
        Ok(Self { hashes })
    }

    /// Size of the encoding relative to `prev_hash`.
    pub fn serialized_size_with(&self, prev_hash: &Hash) -> usize {
        let bits = self.repeat_bits(prev_hash);
        let repeated: usize = bits.iter().map(|b| b.count_ones() as usize).sum();
        1 + bits.len() + (self.hashes.len() - repeated) * 32
    }

    /// Commitment stored in the header.
    pub fn hash(&self, prev_hash: &Hash) -> Hash {
        let mut writer = SerialWriter::with_capacity(self.serialized_size_with(prev_hash));
        self.encode_with(&mut writer, prev_hash);
        Hash::digest(writer.as_slice())
    }
}
