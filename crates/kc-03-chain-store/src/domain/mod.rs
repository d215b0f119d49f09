//! # Domain Layer
//!
//! Chain records and storage errors.

pub mod chain;
pub mod errors;

pub use chain::Chain;
pub use errors::{StoreError, StoreResult};
