//! Block header
//!
//! The header is the only mined part of a block. Its identity is
//! `hash(serialize(header))`; everything else a block carries is bound to
//! it through the interlink and body commitments.

use serde::{Deserialize, Serialize};
use shared_types::{CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter};

use crate::config::ConsensusPolicy;
use crate::domain::target::{meets_target, CompactTarget, U256};

/// Header versions this node understands
pub const SUPPORTED_VERSIONS: &[u16] = &[1];

/// Serialized header size in bytes
pub const HEADER_SIZE: usize = 2 + 4 * 32 + 4 * 4;

/// Block header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Protocol version for this block.
    pub version: u16,
    /// Hash of the parent header.
    pub prev_hash: Hash,
    /// Commitment to the block's interlink.
    pub interlink_hash: Hash,
    /// Commitment to the block's body.
    pub body_hash: Hash,
    /// Account-tree root after applying this block.
    pub accounts_hash: Hash,
    /// Proof-of-work target in compact form.
    pub n_bits: CompactTarget,
    /// Height in the chain, genesis is 1.
    pub height: u32,
    /// Unix timestamp (seconds).
    pub timestamp: u32,
    /// Mining nonce.
    pub nonce: u32,
}

impl Header {
    /// Identity of the header, and of the block it belongs to.
    pub fn hash(&self) -> Hash {
        Hash::digest(&self.to_bytes())
    }

    /// `hash <= target(n_bits)`.
    pub fn verify_proof_of_work(&self) -> bool {
        meets_target(&self.hash(), self.n_bits.to_target())
    }

    /// Difficulty of this header under `policy`.
    pub fn difficulty(&self, policy: &ConsensusPolicy) -> u64 {
        policy.difficulty(self.n_bits)
    }

    /// Superblock level: the largest `k` with `hash * 2^k <= target`.
    /// Zero for a hash above its target.
    pub fn superblock_level(&self) -> u32 {
        let target = self.n_bits.to_target();
        let hash = U256::from_big_endian(&self.hash().0);
        if hash > target {
            return 0;
        }
        if hash.is_zero() {
            return 255;
        }
        let mut level = target.bits() - hash.bits();
        if (hash << level) > target {
            level -= 1;
        }
        level as u32
    }

    /// Parent link, height and timestamp order against `parent`.
    pub fn is_immediate_successor_of(&self, parent: &Header) -> bool {
        self.prev_hash == parent.hash()
            && parent.height.checked_add(1) == Some(self.height)
            && self.timestamp > parent.timestamp
    }
}

impl Encode for Header {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_u16(self.version);
        self.prev_hash.encode(writer);
        self.interlink_hash.encode(writer);
        self.body_hash.encode(writer);
        self.accounts_hash.encode(writer);
        self.n_bits.encode(writer);
        writer.write_u32(self.height);
        writer.write_u32(self.timestamp);
        writer.write_u32(self.nonce);
    }

    fn serialized_size(&self) -> usize {
        HEADER_SIZE
    }
}

impl Decode for Header {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let version = reader.read_u16()?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(CodecError::invalid(
                "header.version",
                format!("unsupported version {version}"),
            ));
        }
        Ok(Self {
            version,
            prev_hash: Hash::decode(reader)?,
            interlink_hash: Hash::decode(reader)?,
            body_hash: Hash::decode(reader)?,
            accounts_hash: Hash::decode(reader)?,
            n_bits: CompactTarget::decode(reader)?,
            height: reader.read_u32()?,
            timestamp: reader.read_u32()?,
            nonce: reader.read_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            version: 1,
            prev_hash: Hash([1; 32]),
            interlink_hash: Hash([2; 32]),
            body_hash: Hash([3; 32]),
            accounts_hash: Hash([4; 32]),
            n_bits: ConsensusPolicy::for_testing().max_compact(),
            height: 2,
            timestamp: 1_700_000_060,
            nonce: 42,
        }
    }

    #[test]
    fn test_serialized_size() {
        let header = sample();
        assert_eq!(header.to_bytes().len(), HEADER_SIZE);
        assert_eq!(HEADER_SIZE, 146);
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut header = sample();
        header.version = 9;
        assert!(matches!(
            Header::from_bytes(&header.to_bytes()),
            Err(CodecError::InvalidValue { field: "header.version", .. })
        ));
    }

    #[test]
    fn test_nonce_changes_identity() {
        let a = sample();
        let mut b = sample();
        b.nonce += 1;
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_superblock_level_of_mined_headers() {
        let mut header = sample();
        let target = header.n_bits.to_target();
        for nonce in 0..200 {
            header.nonce = nonce;
            let hash = U256::from_big_endian(&header.hash().0);
            let level = header.superblock_level();
            if hash > target {
                assert_eq!(level, 0);
            } else {
                assert!(hash << (level as usize) <= target);
                assert!(level >= 32 || (hash << (level as usize + 1)) > target);
            }
        }
    }

    #[test]
    fn test_immediate_successor() {
        let parent = sample();
        let mut child = sample();
        child.prev_hash = parent.hash();
        child.height = parent.height + 1;
        child.timestamp = parent.timestamp + 60;
        assert!(child.is_immediate_successor_of(&parent));

        child.timestamp = parent.timestamp;
        assert!(!child.is_immediate_successor_of(&parent));
    }
}
