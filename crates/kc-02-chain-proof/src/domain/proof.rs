//! # Chain Proof
//!
//! Prefix of light blocks (header + interlink) followed by a suffix of bare
//! headers.
//!
//! ## Wire format
//!
//! ```text
//! prefix_count: u16 | light blocks | suffix_count: u16 | headers
//! ```

use kc_01_block_model::{Block, Header};
use serde::{Deserialize, Serialize};
use shared_types::{CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter};

use super::errors::{ProofError, ProofResult};

/// Maximum prefix entries
pub const PROOF_PREFIX_MAX: usize = 2048;

/// Maximum suffix entries
pub const PROOF_SUFFIX_MAX: usize = 2048;

/// Sparse prefix + dense suffix proof of a chain's work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainProof {
    prefix: Vec<Block>,
    suffix: Vec<Header>,
}

impl ChainProof {
    /// Build from parts, enforcing size bounds and light prefix blocks.
    pub fn new(prefix: Vec<Block>, suffix: Vec<Header>) -> ProofResult<Self> {
        if prefix.len() > PROOF_PREFIX_MAX {
            return Err(ProofError::TooLarge {
                part: "prefix",
                len: prefix.len(),
                max: PROOF_PREFIX_MAX,
            });
        }
        if suffix.len() > PROOF_SUFFIX_MAX {
            return Err(ProofError::TooLarge {
                part: "suffix",
                len: suffix.len(),
                max: PROOF_SUFFIX_MAX,
            });
        }
        if prefix.iter().any(Block::is_full) {
            return Err(ProofError::FullBlockInPrefix);
        }
        Ok(Self { prefix, suffix })
    }

    /// Sparse part, oldest first.
    pub fn prefix(&self) -> &[Block] {
        &self.prefix
    }

    /// Dense part, oldest first.
    pub fn suffix(&self) -> &[Header] {
        &self.suffix
    }

    /// Header of the proven chain's head.
    pub fn head(&self) -> Option<&Header> {
        self.suffix
            .last()
            .or_else(|| self.prefix.last().map(|block| &block.header))
    }

    /// Hash of the proven chain's head.
    pub fn head_hash(&self) -> Option<Hash> {
        self.head().map(Header::hash)
    }

    /// Height of the proven chain's head, 0 for an empty proof.
    pub fn head_height(&self) -> u32 {
        self.head().map_or(0, |header| header.height)
    }
}

impl Encode for ChainProof {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_list_u16(&self.prefix);
        writer.write_list_u16(&self.suffix);
    }
}

impl Decode for ChainProof {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let prefix = reader.read_list_u16("chain_proof.prefix", PROOF_PREFIX_MAX)?;
        let suffix = reader.read_list_u16("chain_proof.suffix", PROOF_SUFFIX_MAX)?;
        Self::new(prefix, suffix).map_err(CodecError::from)
    }
}
