//! # Domain Layer
//!
//! Message types, payloads and protocol errors.

pub mod errors;
pub mod inventory;
pub mod message;
pub mod message_type;
pub mod payloads;

pub use errors::{ProtocolError, ProtocolResult};
pub use inventory::{InvType, InvVector, Inventory, VECTORS_MAX};
pub use message::Message;
pub use message_type::MessageType;
pub use payloads::{
    GetBlocksDirection, GetBlocksMessage, RejectCode, RejectMessage, Services, Subscription,
    VersionMessage, ADDRESSES_MAX, CHALLENGE_SIZE, GETBLOCKS_LOCATORS_MAX, PROTOCOL_VERSION,
};
