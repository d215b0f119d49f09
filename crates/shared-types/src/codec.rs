//! # Wire Codec
//!
//! Big-endian, fixed-width integer encoding with 1- or 2-byte length
//! prefixes for variable-length fields.
//!
//! Encoding is infallible: entity constructors enforce every length bound,
//! so anything that reached a writer already fits its prefix. Decoding
//! checks every bound again because the input is untrusted.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Result type alias for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding untrusted bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Input ended before the field was complete.
    #[error("Unexpected end of input: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    /// Input had bytes left after the value was decoded.
    #[error("Trailing bytes after value: {0}")]
    TrailingBytes(usize),

    /// A length-prefixed field exceeds its bound.
    #[error("Field `{field}` has {len} entries, maximum is {max}")]
    LengthExceeded {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A field decoded to a value outside its domain.
    #[error("Invalid value for `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl CodecError {
    /// Shorthand for [`CodecError::InvalidValue`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Check `len <= max`, naming the field on failure.
    pub fn check_len(field: &'static str, len: usize, max: usize) -> CodecResult<()> {
        if len > max {
            return Err(Self::LengthExceeded { field, len, max });
        }
        Ok(())
    }
}

// =============================================================================
// ENCODE / DECODE TRAITS
// =============================================================================

/// A value with a canonical wire encoding.
pub trait Encode {
    /// Append the encoding to `writer`.
    fn encode(&self, writer: &mut SerialWriter);

    /// Size of the encoding in bytes.
    fn serialized_size(&self) -> usize {
        self.to_bytes().len()
    }

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = SerialWriter::new();
        self.encode(&mut writer);
        writer.into_vec()
    }
}

/// A value decodable from untrusted bytes.
pub trait Decode: Sized {
    /// Read one value, leaving the reader positioned after it.
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self>;

    /// Decode a value that must span the whole input.
    fn from_bytes(bytes: &[u8]) -> CodecResult<Self> {
        let mut reader = SerialReader::new(bytes);
        let value = Self::decode(&mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

// =============================================================================
// WRITER
// =============================================================================

/// Append-only big-endian writer.
#[derive(Debug, Default)]
pub struct SerialWriter {
    buf: BytesMut,
}

impl SerialWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.put_u16(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Write `bytes` behind a one-byte length. Callers guarantee `len <= 255`.
    pub fn write_var_bytes_u8(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= u8::MAX as usize);
        self.buf.put_u8(bytes.len() as u8);
        self.buf.put_slice(bytes);
    }

    /// Write `bytes` behind a two-byte length. Callers guarantee `len <= 65535`.
    pub fn write_var_bytes_u16(&mut self, bytes: &[u8]) {
        debug_assert!(bytes.len() <= u16::MAX as usize);
        self.buf.put_u16(bytes.len() as u16);
        self.buf.put_slice(bytes);
    }

    /// Write a list behind a two-byte count.
    pub fn write_list_u16<T: Encode>(&mut self, items: &[T]) {
        debug_assert!(items.len() <= u16::MAX as usize);
        self.buf.put_u16(items.len() as u16);
        for item in items {
            item.encode(self);
        }
    }

    /// Overwrite four bytes at `offset` with a big-endian `u32`.
    pub fn patch_u32(&mut self, offset: usize, value: u32) {
        self.buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

// =============================================================================
// READER
// =============================================================================

/// Bounds-checked big-endian reader over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct SerialReader<'a> {
    buf: &'a [u8],
    consumed: usize,
}

impl<'a> SerialReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, consumed: 0 }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    /// Bytes read so far.
    pub fn position(&self) -> usize {
        self.consumed
    }

    fn need(&self, needed: usize) -> CodecResult<()> {
        if self.buf.remaining() < needed {
            return Err(CodecError::UnexpectedEnd {
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        self.need(1)?;
        self.consumed += 1;
        Ok(self.buf.get_u8())
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        self.need(2)?;
        self.consumed += 2;
        Ok(self.buf.get_u16())
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        self.need(4)?;
        self.consumed += 4;
        Ok(self.buf.get_u32())
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.need(8)?;
        self.consumed += 8;
        Ok(self.buf.get_u64())
    }

    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        self.need(len)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        self.consumed += len;
        Ok(head)
    }

    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_var_bytes_u8(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_u8()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Read a two-byte length prefixed byte string bounded by `max`.
    pub fn read_var_bytes_u16(&mut self, field: &'static str, max: usize) -> CodecResult<Vec<u8>> {
        let len = self.read_u16()? as usize;
        CodecError::check_len(field, len, max)?;
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Read a one-byte length prefixed printable ASCII string.
    pub fn read_ascii_u8(&mut self, field: &'static str) -> CodecResult<String> {
        let raw = self.read_var_bytes_u8()?;
        if !raw.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            return Err(CodecError::invalid(field, "not printable ASCII"));
        }
        String::from_utf8(raw).map_err(|e| CodecError::invalid(field, e.to_string()))
    }

    /// Read a list behind a two-byte count bounded by `max`.
    pub fn read_list_u16<T: Decode>(&mut self, field: &'static str, max: usize) -> CodecResult<Vec<T>> {
        let count = self.read_u16()? as usize;
        CodecError::check_len(field, count, max)?;
        let mut items = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }

    /// Fail if any bytes remain.
    pub fn finish(self) -> CodecResult<()> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers_are_big_endian() {
        let mut w = SerialWriter::new();
        w.write_u16(0x0102);
        w.write_u32(0x0304_0506);
        w.write_u64(1);
        assert_eq!(
            w.as_slice(),
            &[1, 2, 3, 4, 5, 6, 0, 0, 0, 0, 0, 0, 0, 1]
        );
    }

    #[test]
    fn test_short_input_is_unexpected_end() {
        let mut r = SerialReader::new(&[0x00, 0x01, 0x02]);
        assert_eq!(
            r.read_u32(),
            Err(CodecError::UnexpectedEnd {
                needed: 4,
                remaining: 3
            })
        );
    }

    #[test]
    fn test_finish_rejects_trailing_bytes() {
        let mut r = SerialReader::new(&[0x00, 0x01, 0xFF]);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert_eq!(r.position(), 2);
        assert_eq!(r.finish(), Err(CodecError::TrailingBytes(1)));
    }

    #[test]
    fn test_var_bytes_u16_bound_enforced() {
        let mut w = SerialWriter::new();
        w.write_var_bytes_u16(&[7u8; 10]);
        let bytes = w.into_vec();
        let mut r = SerialReader::new(&bytes);
        assert!(matches!(
            r.read_var_bytes_u16("extra", 4),
            Err(CodecError::LengthExceeded { len: 10, max: 4, .. })
        ));
    }

    #[test]
    fn test_ascii_rejects_control_characters() {
        let mut w = SerialWriter::new();
        w.write_var_bytes_u8(b"ok\n");
        let bytes = w.into_vec();
        let mut r = SerialReader::new(&bytes);
        assert!(r.read_ascii_u8("agent").is_err());
    }

    #[test]
    fn test_patch_u32() {
        let mut w = SerialWriter::new();
        w.write_u32(0);
        w.write_u32(0xAABB_CCDD);
        w.patch_u32(0, 7);
        assert_eq!(&w.as_slice()[..4], &[0, 0, 0, 7]);
    }

    proptest::proptest! {
        #[test]
        fn prop_reader_never_panics(data in proptest::collection::vec(proptest::num::u8::ANY, 0..64)) {
            let mut r = SerialReader::new(&data);
            let _ = r.read_var_bytes_u16("blob", 16);
            let _ = r.read_u64();
            let _ = r.read_ascii_u8("text");
        }
    }
}
