//! # Structured Payloads
//!
//! Payloads with more than one field. Constructors enforce every bound the
//! decoder enforces.

use kc_01_block_model::{Block, Transaction};
use shared_types::{
    Address, CodecError, CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter,
};

use super::errors::{ProtocolError, ProtocolResult};

/// Protocol version spoken by this node.
pub const PROTOCOL_VERSION: u32 = 1;

/// Length of the handshake challenge nonce.
pub const CHALLENGE_SIZE: usize = 32;

/// Maximum locators in a `GetBlocks` request.
pub const GETBLOCKS_LOCATORS_MAX: usize = 128;

/// Maximum addresses in an address subscription.
pub const ADDRESSES_MAX: usize = 1000;

const USER_AGENT_MAX: usize = u8::MAX as usize;
const REJECT_REASON_MAX: usize = u8::MAX as usize;
const REJECT_EXTRA_DATA_MAX: usize = u16::MAX as usize;

// =============================================================================
// SERVICES
// =============================================================================

/// Service flags a node advertises in its `Version`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Services(pub u32);

impl Services {
    pub const NONE: Self = Self(0);
    /// Serves headers only
    pub const NANO: Self = Self(1);
    /// Serves chain proofs and recent blocks
    pub const LIGHT: Self = Self(1 << 1);
    /// Serves the full block history
    pub const FULL: Self = Self(1 << 2);

    pub fn provides(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

// =============================================================================
// VERSION
// =============================================================================

/// Handshake opener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMessage {
    pub version: u32,
    pub services: Services,
    pub genesis_hash: Hash,
    pub head_hash: Hash,
    /// Random per-connection nonce; equal nonces on both ends mean the node
    /// dialed itself
    pub challenge_nonce: [u8; CHALLENGE_SIZE],
    user_agent: Option<String>,
}

impl VersionMessage {
    /// # Errors
    /// `FieldTooLong`/`InvalidField` for a user agent over 255 bytes or
    /// outside printable ASCII.
    pub fn new(
        version: u32,
        services: Services,
        genesis_hash: Hash,
        head_hash: Hash,
        challenge_nonce: [u8; CHALLENGE_SIZE],
        user_agent: Option<String>,
    ) -> ProtocolResult<Self> {
        if let Some(agent) = &user_agent {
            ProtocolError::check_ascii("version.user_agent", agent, USER_AGENT_MAX)?;
        }
        Ok(Self {
            version,
            services,
            genesis_hash,
            head_hash,
            challenge_nonce,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Same protocol version and same genesis block.
    pub fn is_compatible(&self, genesis_hash: &Hash) -> bool {
        self.version == PROTOCOL_VERSION && self.genesis_hash == *genesis_hash
    }
}

impl Encode for VersionMessage {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_u32(self.version);
        writer.write_u32(self.services.0);
        self.genesis_hash.encode(writer);
        self.head_hash.encode(writer);
        writer.write_bytes(&self.challenge_nonce);
        if let Some(agent) = &self.user_agent {
            writer.write_var_bytes_u8(agent.as_bytes());
        }
    }
}

impl Decode for VersionMessage {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let version = reader.read_u32()?;
        let services = Services(reader.read_u32()?);
        let genesis_hash = Hash::decode(reader)?;
        let head_hash = Hash::decode(reader)?;
        let challenge_nonce = reader.read_array::<CHALLENGE_SIZE>()?;
        let user_agent = if reader.remaining() > 0 {
            Some(reader.read_ascii_u8("version.user_agent")?)
        } else {
            None
        };
        Ok(Self {
            version,
            services,
            genesis_hash,
            head_hash,
            challenge_nonce,
            user_agent,
        })
    }
}

// =============================================================================
// GETBLOCKS
// =============================================================================

/// Walk direction of a `GetBlocks` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GetBlocksDirection {
    Forward = 1,
    Backward = 2,
}

impl TryFrom<u8> for GetBlocksDirection {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        match tag {
            1 => Ok(Self::Forward),
            2 => Ok(Self::Backward),
            other => Err(other),
        }
    }
}

/// Request for block hashes next to the first known locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetBlocksMessage {
    locators: Vec<Hash>,
    pub max_inv_size: u16,
    pub direction: GetBlocksDirection,
}

impl GetBlocksMessage {
    /// # Errors
    /// `FieldTooLong` beyond [`GETBLOCKS_LOCATORS_MAX`] locators.
    pub fn new(
        locators: Vec<Hash>,
        max_inv_size: u16,
        direction: GetBlocksDirection,
    ) -> ProtocolResult<Self> {
        ProtocolError::check_len("getblocks.locators", locators.len(), GETBLOCKS_LOCATORS_MAX)?;
        Ok(Self {
            locators,
            max_inv_size,
            direction,
        })
    }

    pub fn locators(&self) -> &[Hash] {
        &self.locators
    }
}

impl Encode for GetBlocksMessage {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_list_u16(&self.locators);
        writer.write_u16(self.max_inv_size);
        writer.write_u8(self.direction as u8);
    }
}

impl Decode for GetBlocksMessage {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let locators = reader.read_list_u16("getblocks.locators", GETBLOCKS_LOCATORS_MAX)?;
        let max_inv_size = reader.read_u16()?;
        let direction = GetBlocksDirection::try_from(reader.read_u8()?).map_err(|tag| {
            CodecError::invalid("getblocks.direction", format!("unknown direction {tag}"))
        })?;
        Ok(Self {
            locators,
            max_inv_size,
            direction,
        })
    }
}

// =============================================================================
// SUBSCRIBE
// =============================================================================

/// Which announcements a peer wants to receive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Subscription {
    /// Nothing
    #[default]
    None,
    /// Every block and transaction
    Any,
    /// Every block, transactions touching these addresses
    Addresses(Vec<Address>),
    /// Every block, transactions paying at least this fee
    MinFee(u64),
}

impl Subscription {
    /// # Errors
    /// `FieldTooLong` beyond [`ADDRESSES_MAX`] addresses.
    pub fn addresses(addresses: Vec<Address>) -> ProtocolResult<Self> {
        ProtocolError::check_len("subscription.addresses", addresses.len(), ADDRESSES_MAX)?;
        Ok(Self::Addresses(addresses))
    }

    pub fn matches_block(&self, _block: &Block) -> bool {
        !matches!(self, Self::None)
    }

    pub fn matches_transaction(&self, tx: &Transaction) -> bool {
        match self {
            Self::None => false,
            Self::Any => true,
            Self::Addresses(addresses) => {
                addresses.contains(tx.sender()) || addresses.contains(tx.recipient())
            }
            Self::MinFee(min_fee) => tx.fee() >= *min_fee,
        }
    }
}

impl Encode for Subscription {
    fn encode(&self, writer: &mut SerialWriter) {
        match self {
            Self::None => writer.write_u8(0),
            Self::Any => writer.write_u8(1),
            Self::Addresses(addresses) => {
                writer.write_u8(2);
                writer.write_list_u16(addresses);
            }
            Self::MinFee(min_fee) => {
                writer.write_u8(3);
                writer.write_u64(*min_fee);
            }
        }
    }
}

impl Decode for Subscription {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        match reader.read_u8()? {
            0 => Ok(Self::None),
            1 => Ok(Self::Any),
            2 => Ok(Self::Addresses(
                reader.read_list_u16("subscription.addresses", ADDRESSES_MAX)?,
            )),
            3 => Ok(Self::MinFee(reader.read_u64()?)),
            other => Err(CodecError::invalid(
                "subscription.type",
                format!("unknown type {other}"),
            )),
        }
    }
}

// =============================================================================
// REJECT
// =============================================================================

/// Reason class of a `Reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RejectCode {
    Malformed = 0x01,
    Invalid = 0x10,
    Obsolete = 0x11,
    Duplicate = 0x12,
    Dust = 0x41,
    InsufficientFee = 0x42,
}

impl TryFrom<u8> for RejectCode {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, u8> {
        match tag {
            0x01 => Ok(Self::Malformed),
            0x10 => Ok(Self::Invalid),
            0x11 => Ok(Self::Obsolete),
            0x12 => Ok(Self::Duplicate),
            0x41 => Ok(Self::Dust),
            0x42 => Ok(Self::InsufficientFee),
            other => Err(other),
        }
    }
}

/// Notice that a message was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectMessage {
    /// Raw tag of the refused message, which may be unknown to us
    pub message_type: u32,
    pub code: RejectCode,
    reason: String,
    extra_data: Vec<u8>,
}

impl RejectMessage {
    /// # Errors
    /// Reason over 255 bytes or not printable ASCII, extra data over
    /// 65535 bytes.
    pub fn new(
        message_type: u32,
        code: RejectCode,
        reason: impl Into<String>,
        extra_data: Vec<u8>,
    ) -> ProtocolResult<Self> {
        let reason = reason.into();
        ProtocolError::check_ascii("reject.reason", &reason, REJECT_REASON_MAX)?;
        ProtocolError::check_len("reject.extra_data", extra_data.len(), REJECT_EXTRA_DATA_MAX)?;
        Ok(Self {
            message_type,
            code,
            reason,
            extra_data,
        })
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }
}

impl Encode for RejectMessage {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_u32(self.message_type);
        writer.write_u8(self.code as u8);
        writer.write_var_bytes_u8(self.reason.as_bytes());
        writer.write_var_bytes_u16(&self.extra_data);
    }
}

impl Decode for RejectMessage {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        let message_type = reader.read_u32()?;
        let code = RejectCode::try_from(reader.read_u8()?)
            .map_err(|tag| CodecError::invalid("reject.code", format!("unknown code {tag:#04x}")))?;
        let reason = reader.read_ascii_u8("reject.reason")?;
        let extra_data = reader.read_var_bytes_u16("reject.extra_data", REJECT_EXTRA_DATA_MAX)?;
        Ok(Self {
            message_type,
            code,
            reason,
            extra_data,
        })
    }
}
