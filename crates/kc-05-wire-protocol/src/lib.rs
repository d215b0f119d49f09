//! # Kestrel Chain - Wire Protocol (Subsystem 05)
//!
//! **Bounded Context:** Peer-to-peer message encoding
//!
//! ## Frame Layout
//!
//! ```text
//! magic u32 | type u32 | length u32 | checksum u32 | payload
//! ```
//!
//! All integers are big-endian. `length` covers the whole frame. `checksum`
//! is the CRC32 of the whole frame with the checksum field zeroed.
//!
//! ## Dispatch
//!
//! [`MessageType`] is a closed enum; [`MessageFactory::parse`] converts the
//! peeked type tag with an exhaustive match and hands the payload to the
//! matching decoder. Nothing a peer sends can extend or alter the table.
//!
//! ## Validation Order
//!
//! | Step | Failure | Kind |
//! |------|---------|------|
//! | type tag | not in the table | `UnknownMessageType` |
//! | magic, length | mismatch | `MalformedInput` |
//! | checksum | mismatch | `CorruptMessage` |
//! | payload | bad field, trailing bytes | `MalformedInput` |
//!
//! Every variable-length field is bounded in its constructor and again on
//! decode, so an oversized message can neither be built nor accepted.

pub mod domain;
pub mod framing;

pub use domain::{
    GetBlocksDirection, GetBlocksMessage, InvType, InvVector, Inventory, Message, MessageType,
    ProtocolError, ProtocolResult, RejectCode, RejectMessage, Services, Subscription,
    VersionMessage, ADDRESSES_MAX, CHALLENGE_SIZE, GETBLOCKS_LOCATORS_MAX, PROTOCOL_VERSION,
    VECTORS_MAX,
};
pub use framing::{MessageFactory, FRAME_HEADER_SIZE, MAGIC, MAX_MESSAGE_SIZE};
