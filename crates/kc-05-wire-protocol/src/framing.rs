//! # Framing
//!
//! [`MessageFactory`] turns [`Message`]s into checksummed frames and back.

use crc32fast::Hasher;
use shared_types::{CodecError, SerialReader, SerialWriter};
use tracing::trace;

use crate::domain::{Message, MessageType, ProtocolError, ProtocolResult};

/// Network magic at the start of every frame.
pub const MAGIC: u32 = 0x4204_2042;

/// `magic | type | length | checksum`
pub const FRAME_HEADER_SIZE: usize = 16;

/// Largest frame accepted from a peer.
pub const MAX_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

const TYPE_OFFSET: usize = 4;
const LENGTH_OFFSET: usize = 8;
const CHECKSUM_OFFSET: usize = 12;

fn frame_checksum(frame: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&frame[..CHECKSUM_OFFSET]);
    hasher.update(&[0u8; 4]);
    hasher.update(&frame[FRAME_HEADER_SIZE..]);
    hasher.finalize()
}

fn read_u32_at(frame: &[u8], offset: usize) -> Option<u32> {
    let bytes = frame.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Stateless frame encoder and parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageFactory;

impl MessageFactory {
    /// Frame a message.
    pub fn encode(message: &Message) -> Vec<u8> {
        let mut writer = SerialWriter::new();
        writer.write_u32(MAGIC);
        writer.write_u32(message.message_type().tag());
        writer.write_u32(0);
        writer.write_u32(0);
        message.encode_payload(&mut writer);

        let length = writer.len() as u32;
        writer.patch_u32(LENGTH_OFFSET, length);
        let checksum = frame_checksum(writer.as_slice());
        writer.patch_u32(CHECKSUM_OFFSET, checksum);
        writer.into_vec()
    }

    /// Raw type tag of a frame, without validating anything else.
    pub fn peek_type(frame: &[u8]) -> ProtocolResult<u32> {
        Self::header_field(frame, TYPE_OFFSET)
    }

    /// Declared length of a frame, for cutting frames out of a byte stream.
    pub fn peek_length(frame: &[u8]) -> ProtocolResult<u32> {
        Self::header_field(frame, LENGTH_OFFSET)
    }

    fn header_field(frame: &[u8], offset: usize) -> ProtocolResult<u32> {
        read_u32_at(frame, offset).ok_or(ProtocolError::Truncated(
            CodecError::UnexpectedEnd {
                needed: offset + 4,
                remaining: frame.len(),
            },
        ))
    }

    /// Validate and decode one complete frame.
    ///
    /// The type tag is checked first, so an unknown type is reported as such
    /// even when the rest of the frame is garbage.
    pub fn parse(frame: &[u8]) -> ProtocolResult<Message> {
        if frame.len() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::Truncated(
                CodecError::UnexpectedEnd {
                    needed: FRAME_HEADER_SIZE,
                    remaining: frame.len(),
                },
            ));
        }
        let tag = Self::peek_type(frame)?;
        let message_type =
            MessageType::try_from(tag).map_err(ProtocolError::UnknownMessageType)?;

        let magic = Self::header_field(frame, 0)?;
        if magic != MAGIC {
            return Err(ProtocolError::BadMagic(magic));
        }
        if frame.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                len: frame.len(),
                max: MAX_MESSAGE_SIZE,
            });
        }
        let declared = Self::peek_length(frame)?;
        if declared as usize != frame.len() {
            return Err(ProtocolError::LengthMismatch {
                declared,
                actual: frame.len(),
            });
        }
        let expected = Self::header_field(frame, CHECKSUM_OFFSET)?;
        let actual = frame_checksum(frame);
        if expected != actual {
            return Err(ProtocolError::ChecksumMismatch { expected, actual });
        }

        let mut reader = SerialReader::new(&frame[FRAME_HEADER_SIZE..]);
        let message = Message::decode_payload(message_type, &mut reader)
            .and_then(|message| reader.finish().map(|()| message))
            .map_err(|source| ProtocolError::Malformed {
                message_type,
                source,
            })?;
        trace!(%message_type, len = frame.len(), "Parsed frame");
        Ok(message)
    }
}
