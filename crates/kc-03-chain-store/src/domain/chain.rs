//! Chain record
//!
//! Identity of a record is the hash of its head block.

use kc_01_block_model::Block;
use serde::{Deserialize, Serialize};
use shared_types::{CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter};

/// A chain, identified by its head block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Head block of the chain.
    pub head: Block,
    /// Sum of difficulties from genesis to `head`, inclusive.
    pub total_work: u64,
    /// Whether `head` is on the current main chain.
    pub on_main_chain: bool,
}

impl Chain {
    pub fn new(head: Block, total_work: u64, on_main_chain: bool) -> Self {
        Self {
            head,
            total_work,
            on_main_chain,
        }
    }

    /// Identity of the record.
    pub fn hash(&self) -> Hash {
        self.head.hash()
    }

    pub fn height(&self) -> u32 {
        self.head.height()
    }

    /// The chain extended by `block` of difficulty `difficulty`.
    pub fn extend(&self, block: Block, difficulty: u64) -> Chain {
        Chain {
            head: block,
            total_work: self.total_work.saturating_add(difficulty),
            on_main_chain: false,
        }
    }
}

impl Encode for Chain {
    fn encode(&self, writer: &mut SerialWriter) {
        self.head.encode(writer);
        writer.write_u64(self.total_work);
        writer.write_u8(u8::from(self.on_main_chain));
    }
}

impl Decode for Chain {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let head = Block::decode(reader)?;
        let total_work = reader.read_u64()?;
        let on_main_chain = match reader.read_u8()? {
            0 => false,
            1 => true,
            other => {
                return Err(CodecError::invalid(
                    "chain.on_main_chain",
                    format!("flag {other}"),
                ))
            }
        };
        Ok(Self::new(head, total_work, on_main_chain))
    }
}
