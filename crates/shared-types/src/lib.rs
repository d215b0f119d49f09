//! # Shared Types Crate
//!
//! Primitives shared by every Kestrel-Chain subsystem.
//!
//! ## Contents
//!
//! - **Fixed-size bytes**: [`Hash`] and [`Address`], both implementing the
//!   [`FixedBytes`] trait instead of inheriting from a common base type.
//! - **Codec**: big-endian [`SerialWriter`]/[`SerialReader`] and the
//!   [`Encode`]/[`Decode`] traits every wire entity implements.
//! - **Time**: the [`TimeSource`] port used for timestamp-drift checks.

pub mod codec;
pub mod errors;
pub mod hashing;
pub mod primitives;
pub mod time;

pub use codec::{CodecError, CodecResult, Decode, Encode, SerialReader, SerialWriter};
pub use errors::ErrorKind;
pub use hashing::sha256;
pub use primitives::{Address, FixedBytes, Hash};
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
