//! Compact targets and proof-of-work checks
//!
//! **IMPORTANT**: the target is a CEILING:
//! - HIGHER target number = EASIER (more valid hashes below it)
//! - LOWER target number = HARDER (fewer valid hashes below it)
//!
//! On the wire a target travels as a Bitcoin-style `nBits` word: one size
//! byte followed by a 23-bit mantissa (the sign bit is never set).

use std::fmt;

pub use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::{CodecResult, Decode, Encode, Hash, SerialReader, SerialWriter};

/// A 256-bit target in compact `nBits` form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CompactTarget(pub u32);

impl CompactTarget {
    /// Expand to the full target. Encodings wider than 256 bits saturate to
    /// `U256::MAX`, which no policy accepts.
    pub fn to_target(self) -> U256 {
        let size = (self.0 >> 24) as usize;
        let mantissa = self.0 & 0x007F_FFFF;
        if size <= 3 {
            return U256::from(mantissa >> (8 * (3 - size)));
        }
        let shift = 8 * (size - 3);
        let mantissa_bits = (32 - mantissa.leading_zeros()) as usize;
        if mantissa_bits + shift > 256 {
            U256::MAX
        } else {
            U256::from(mantissa) << shift
        }
    }

    /// Compress a target, truncating precision below the mantissa.
    pub fn from_target(target: U256) -> Self {
        let mut size = (target.bits() as u32 + 7) / 8;
        let mut mantissa = if size <= 3 {
            (target.low_u64() << (8 * (3 - size))) as u32
        } else {
            (target >> (8 * (size as usize - 3))).low_u32()
        };
        // Keep the sign bit clear.
        if mantissa & 0x0080_0000 != 0 {
            mantissa >>= 8;
            size += 1;
        }
        Self((size << 24) | (mantissa & 0x007F_FFFF))
    }

    /// Non-zero target no easier than `max`.
    pub fn is_valid(self, max: U256) -> bool {
        let target = self.to_target();
        self.0 & 0x0080_0000 == 0 && !target.is_zero() && target <= max
    }

    /// Leading zero bits of the expanded target.
    pub fn leading_zero_bits(self) -> u32 {
        self.to_target().leading_zeros()
    }
}

impl fmt::Debug for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompactTarget({:#010x})", self.0)
    }
}

impl fmt::Display for CompactTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Encode for CompactTarget {
    fn encode(&self, writer: &mut SerialWriter) {
        writer.write_u32(self.0);
    }

    fn serialized_size(&self) -> usize {
        4
    }
}

impl Decode for CompactTarget {
    fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
        reader.read_u32().map(Self)
    }
}

/// Check `hash <= target` with the hash read as a big-endian integer.
pub fn meets_target(hash: &Hash, target: U256) -> bool {
    U256::from_big_endian(&hash.0) <= target
}
