//! The message catalogue.

use kc_01_block_model::{Block, Header, Transaction};
use kc_02_chain_proof::ChainProof;
use shared_types::{CodecResult, Decode, Encode, SerialReader, SerialWriter};

use super::inventory::Inventory;
use super::message_type::MessageType;
use super::payloads::{GetBlocksMessage, RejectMessage, Subscription, VersionMessage};

/// One decoded protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Version(VersionMessage),
    VerAck,
    Inv(Inventory),
    GetData(Inventory),
    NotFound(Inventory),
    GetBlocks(GetBlocksMessage),
    GetHead,
    Head(Header),
    Block(Box<Block>),
    Tx(Transaction),
    GetChainProof,
    ChainProof(Box<ChainProof>),
    Mempool,
    Ping(u32),
    Pong(u32),
    Subscribe(Subscription),
    Reject(RejectMessage),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Version(_) => MessageType::Version,
            Self::VerAck => MessageType::VerAck,
            Self::Inv(_) => MessageType::Inv,
            Self::GetData(_) => MessageType::GetData,
            Self::NotFound(_) => MessageType::NotFound,
            Self::GetBlocks(_) => MessageType::GetBlocks,
            Self::GetHead => MessageType::GetHead,
            Self::Head(_) => MessageType::Head,
            Self::Block(_) => MessageType::Block,
            Self::Tx(_) => MessageType::Tx,
            Self::GetChainProof => MessageType::GetChainProof,
            Self::ChainProof(_) => MessageType::ChainProof,
            Self::Mempool => MessageType::Mempool,
            Self::Ping(_) => MessageType::Ping,
            Self::Pong(_) => MessageType::Pong,
            Self::Subscribe(_) => MessageType::Subscribe,
            Self::Reject(_) => MessageType::Reject,
        }
    }

    pub fn block(block: Block) -> Self {
        Self::Block(Box::new(block))
    }

    pub fn chain_proof(proof: ChainProof) -> Self {
        Self::ChainProof(Box::new(proof))
    }

    /// Write the payload only; framing is added by the factory.
    pub fn encode_payload(&self, writer: &mut SerialWriter) {
        match self {
            Self::Version(version) => version.encode(writer),
            Self::Inv(inventory) | Self::GetData(inventory) | Self::NotFound(inventory) => {
                inventory.encode(writer)
            }
            Self::GetBlocks(request) => request.encode(writer),
            Self::Head(header) => header.encode(writer),
            Self::Block(block) => block.encode(writer),
            Self::Tx(tx) => tx.encode(writer),
            Self::ChainProof(proof) => proof.encode(writer),
            Self::Ping(nonce) | Self::Pong(nonce) => writer.write_u32(*nonce),
            Self::Subscribe(subscription) => subscription.encode(writer),
            Self::Reject(reject) => reject.encode(writer),
            Self::VerAck | Self::GetHead | Self::GetChainProof | Self::Mempool => {}
        }
    }

    /// Decode the payload of a message already known to be of type `ty`.
    /// Trailing bytes are left for the caller to reject.
    pub fn decode_payload(ty: MessageType, reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        Ok(match ty {
            MessageType::Version => Self::Version(VersionMessage::decode(reader)?),
            MessageType::VerAck => Self::VerAck,
            MessageType::Inv => Self::Inv(Inventory::decode(reader)?),
            MessageType::GetData => Self::GetData(Inventory::decode(reader)?),
            MessageType::NotFound => Self::NotFound(Inventory::decode(reader)?),
            MessageType::GetBlocks => Self::GetBlocks(GetBlocksMessage::decode(reader)?),
            MessageType::GetHead => Self::GetHead,
            MessageType::Head => Self::Head(Header::decode(reader)?),
            MessageType::Block => Self::Block(Box::new(Block::decode(reader)?)),
            MessageType::Tx => Self::Tx(Transaction::decode(reader)?),
            MessageType::GetChainProof => Self::GetChainProof,
            MessageType::ChainProof => Self::ChainProof(Box::new(ChainProof::decode(reader)?)),
            MessageType::Mempool => Self::Mempool,
            MessageType::Ping => Self::Ping(reader.read_u32()?),
            MessageType::Pong => Self::Pong(reader.read_u32()?),
            MessageType::Subscribe => Self::Subscribe(Subscription::decode(reader)?),
            MessageType::Reject => Self::Reject(RejectMessage::decode(reader)?),
        })
    }
}
