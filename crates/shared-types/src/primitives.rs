//! # Fixed-Size Byte Primitives
//!
//! Every fixed-width identifier shares one trait instead of a common base
//! type. The concrete types are plain `Copy` arrays, so equality, ordering
//! and encoding never go through dynamic dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{CodecResult, Decode, Encode, SerialReader, SerialWriter};
use crate::hashing::{sha256, sha256_pair};

/// A fixed-size byte wrapper with a canonical encoding.
pub trait FixedBytes: Copy + Eq + Ord + std::hash::Hash + Encode + Decode {
    /// Encoded width in bytes.
    const LEN: usize;

    /// Raw bytes.
    fn as_bytes(&self) -> &[u8];

    /// Build from a slice of exactly [`Self::LEN`] bytes.
    fn from_slice(bytes: &[u8]) -> Option<Self>;

    /// All bytes zero.
    fn is_zero(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }

    /// Lowercase hex rendering.
    fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

macro_rules! fixed_bytes {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, std::hash::Hash, Default, Serialize, Deserialize)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            /// The all-zero value.
            pub const ZERO: Self = Self([0u8; $len]);

            pub const fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl FixedBytes for $name {
            const LEN: usize = $len;

            fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            fn from_slice(bytes: &[u8]) -> Option<Self> {
                <[u8; $len]>::try_from(bytes).ok().map(Self)
            }
        }

        impl Encode for $name {
            fn encode(&self, writer: &mut SerialWriter) {
                writer.write_bytes(&self.0);
            }

            fn serialized_size(&self) -> usize {
                $len
            }
        }

        impl Decode for $name {
            fn decode(reader: &mut SerialReader<'_>) -> CodecResult<Self> {
                reader.read_array::<$len>().map(Self)
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}..)", stringify!($name), &hex::encode(&self.0[..4]))
            }
        }
    };
}

fixed_bytes!(
    /// A 32-byte SHA-256 digest.
    Hash,
    32
);

fixed_bytes!(
    /// A 20-byte account address.
    Address,
    20
);

impl Hash {
    /// Hash arbitrary bytes.
    pub fn digest(data: &[u8]) -> Self {
        Self(sha256(data))
    }

    /// Hash the concatenation of two digests (tree node).
    pub fn combine(left: &Hash, right: &Hash) -> Self {
        Self(sha256_pair(&left.0, &right.0))
    }

    /// Number of leading zero bits, 256 for the zero hash.
    pub fn leading_zero_bits(&self) -> u32 {
        let mut bits = 0;
        for byte in self.0 {
            if byte == 0 {
                bits += 8;
            } else {
                bits += byte.leading_zeros();
                break;
            }
        }
        bits
    }
}
