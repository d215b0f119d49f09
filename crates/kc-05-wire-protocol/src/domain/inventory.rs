//! Inventory vectors for `Inv`, `GetData` and `NotFound`.

use kc_01_block_model::{Block, Transaction};
use shared_types::{
    CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter,
};

use super::errors::{ProtocolError, ProtocolResult};

/// Maximum vectors per inventory message.
pub const VECTORS_MAX: usize = 1000;

/// Kind of object an inventory vector names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum InvType {
    Error = 0,
    Transaction = 1,
    Block = 2,
}

impl TryFrom<u32> for InvType {
    type Error = u32;

    fn try_from(tag: u32) -> Result<Self, u32> {
        match tag {
            0 => Ok(Self::Error),
            1 => Ok(Self::Transaction),
            2 => Ok(Self::Block),
            other => Err(other),
        }
    }
}

/// Object reference: type plus hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvVector {
    pub inv_type: InvType,
    pub hash: Hash,
}

impl InvVector {
    pub fn new(inv_type: InvType, hash: Hash) -> Self {
        Self { inv_type, hash }
    }

    pub fn from_block(block: &Block) -> Self {
        Self::new(InvType::Block, block.hash())
    }

    pub fn from_transaction(tx: &Transaction) -> Self {
        Self::new(InvType::Transaction, tx.hash())
    }
}

impl Encode for InvVector {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_u32(self.inv_type as u32);
        self.hash.encode(writer);
    }
}

impl Decode for InvVector {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let tag = reader.read_u32()?;
        let inv_type = InvType::try_from(tag)
            .map_err(|tag| CodecError::invalid("inv_vector.type", format!("unknown type {tag}")))?;
        let hash = Hash::decode(reader)?;
        Ok(Self { inv_type, hash })
    }
}

/// Bounded list of inventory vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    vectors: Vec<InvVector>,
}

impl Inventory {
    /// # Errors
    /// `FieldTooLong` beyond [`VECTORS_MAX`] entries.
    pub fn new(vectors: Vec<InvVector>) -> ProtocolResult<Self> {
        ProtocolError::check_len("inventory.vectors", vectors.len(), VECTORS_MAX)?;
        Ok(Self { vectors })
    }

    /// Split any number of vectors into maximal inventories.
    pub fn chunked(vectors: Vec<InvVector>) -> Vec<Self> {
        vectors
            .chunks(VECTORS_MAX)
            .map(|chunk| Self {
                vectors: chunk.to_vec(),
            })
            .collect()
    }

    pub fn vectors(&self) -> &[InvVector] {
        &self.vectors
    }

    pub fn into_vectors(self) -> Vec<InvVector> {
        self.vectors
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

impl Encode for Inventory {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_list_u16(&self.vectors);
    }
}

impl Decode for Inventory {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let vectors = reader.read_list_u16("inventory.vectors", VECTORS_MAX)?;
        Ok(Self { vectors })
    }
}
