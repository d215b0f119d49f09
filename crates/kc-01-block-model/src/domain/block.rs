//! Block = header + interlink + optional body
//!
//! Light blocks (no body) are what chain proofs carry; full nodes fill the
//! body in before a block can be applied.

use serde::{Deserialize, Serialize};
use shared_types::{CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter};

use crate::config::ConsensusPolicy;
use crate::domain::body::Body;
use crate::domain::header::{Header, SUPPORTED_VERSIONS};
use crate::domain::interlink::Interlink;
use crate::error::{BlockError, BlockResult};

/// A block as exchanged between peers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    pub interlink: Interlink,
    pub body: Option<Body>,
}

impl Block {
    pub fn new(header: Header, interlink: Interlink, body: Option<Body>) -> Self {
        Self {
            header,
            interlink,
            body,
        }
    }

    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn prev_hash(&self) -> &Hash {
        &self.header.prev_hash
    }

    pub fn is_light(&self) -> bool {
        self.body.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.body.is_some()
    }

    /// Copy without the body.
    pub fn to_light(&self) -> Self {
        Self {
            header: self.header.clone(),
            interlink: self.interlink.clone(),
            body: None,
        }
    }

    pub fn superblock_level(&self) -> u32 {
        self.header.superblock_level()
    }

    /// Interlink a successor of this block must carry.
    pub fn next_interlink(&self) -> Interlink {
        self.interlink
            .successor(self.header.hash(), self.header.superblock_level())
    }

    /// Stateless validity: version, drift, target range, proof of work,
    /// interlink and body commitments, size.
    pub fn verify(&self, policy: &ConsensusPolicy, now: u64) -> BlockResult<()> {
        let header = &self.header;
        if !SUPPORTED_VERSIONS.contains(&header.version) {
            return Err(BlockError::UnsupportedVersion(header.version));
        }

        if u64::from(header.timestamp) > now.saturating_add(policy.timestamp_drift_max) {
            return Err(BlockError::TimestampTooFarInFuture {
                timestamp: u64::from(header.timestamp),
                now,
                drift: policy.timestamp_drift_max,
            });
        }

        if !header.n_bits.is_valid(policy.block_target_max) {
            return Err(BlockError::InvalidTarget(header.n_bits.0));
        }

        if !header.verify_proof_of_work() {
            return Err(BlockError::InvalidProofOfWork);
        }

        if self.interlink.hash(&header.prev_hash) != header.interlink_hash {
            return Err(BlockError::InterlinkHashMismatch);
        }

        if let Some(body) = &self.body {
            if body.hash() != header.body_hash {
                return Err(BlockError::BodyHashMismatch);
            }
            body.verify()?;
        }

        let size = self.serialized_size();
        if size > policy.block_size_max {
            return Err(BlockError::BlockTooLarge {
                size,
                max: policy.block_size_max,
            });
        }
        Ok(())
    }

    /// `self` directly follows `parent`: parent link, height, timestamp and
    /// interlink. The retarget rule needs chain context and is checked by
    /// the chain.
    pub fn is_immediate_successor_of(&self, parent: &Block) -> bool {
        self.header.is_immediate_successor_of(&parent.header)
            && self.interlink == parent.next_interlink()
    }

    /// `self` follows `earlier` either directly or through an interlink
    /// entry the earlier block's level entitles it to.
    pub fn is_interlink_successor_of(&self, earlier: &Block) -> bool {
        if self.header.height <= earlier.header.height
            || self.header.timestamp <= earlier.header.timestamp
        {
            return false;
        }

        let earlier_hash = earlier.hash();
        if self.header.prev_hash == earlier_hash {
            return self.header.height == earlier.header.height + 1;
        }

        let level = earlier.superblock_level() as usize;
        self.interlink
            .hashes()
            .iter()
            .take(level + 1)
            .any(|hash| *hash == earlier_hash)
    }
}

impl Encode for Block {
    fn encode(&self, writer: &mut SerialWriter) {
        self.header.encode(writer);
        self.interlink.encode_with(writer, &self.header.prev_hash);
        match &self.body {
            Some(body) => {
                writer.write_u8(1);
                body.encode(writer);
            }
            None => writer.write_u8(0),
        }
    }

    fn serialized_size(&self) -> usize {
        self.header.serialized_size()
            + self.interlink.serialized_size_with(&self.header.prev_hash)
            + 1
            + self.body.as_ref().map_or(0, Encode::serialized_size)
    }
}

impl Decode for Block {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let header = Header::decode(reader)?;
        let interlink = Interlink::decode_with(reader, &header.prev_hash)?;
        let body = match reader.read_u8()? {
            0 => None,
            1 => Some(Body::decode(reader)?),
            other => {
                return Err(CodecError::invalid(
                    "block.body",
                    format!("presence flag {other}"),
                ))
            }
        };
        Ok(Self::new(header, interlink, body))
    }
}
