//! Message type table.

use std::fmt;

/// Closed set of message types. The discriminant is the wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    Version = 0,
    VerAck = 1,
    Inv = 2,
    GetData = 3,
    NotFound = 4,
    GetBlocks = 5,
    GetHead = 6,
    Head = 7,
    Block = 8,
    Tx = 9,
    GetChainProof = 10,
    ChainProof = 11,
    Mempool = 12,
    Ping = 13,
    Pong = 14,
    Subscribe = 15,
    Reject = 16,
}

impl MessageType {
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::VerAck => "verack",
            Self::Inv => "inv",
            Self::GetData => "getdata",
            Self::NotFound => "notfound",
            Self::GetBlocks => "getblocks",
            Self::GetHead => "gethead",
            Self::Head => "head",
            Self::Block => "block",
            Self::Tx => "tx",
            Self::GetChainProof => "getchainproof",
            Self::ChainProof => "chainproof",
            Self::Mempool => "mempool",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Subscribe => "subscribe",
            Self::Reject => "reject",
        }
    }
}

impl TryFrom<u32> for MessageType {
    type Error = u32;

    fn try_from(tag: u32) -> Result<Self, u32> {
        Ok(match tag {
            0 => Self::Version,
            1 => Self::VerAck,
            2 => Self::Inv,
            3 => Self::GetData,
            4 => Self::NotFound,
            5 => Self::GetBlocks,
            6 => Self::GetHead,
            7 => Self::Head,
            8 => Self::Block,
            9 => Self::Tx,
            10 => Self::GetChainProof,
            11 => Self::ChainProof,
            12 => Self::Mempool,
            13 => Self::Ping,
            14 => Self::Pong,
            15 => Self::Subscribe,
            16 => Self::Reject,
            other => return Err(other),
        })
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
