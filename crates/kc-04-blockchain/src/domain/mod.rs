//! # Domain Layer
//!
//! Errors, push outcomes, chain events and locator arithmetic.

pub mod account;
pub mod errors;
pub mod events;
pub mod locators;

pub use account::Account;
pub use errors::{AccountsError, BlockchainError, BlockchainResult, InvalidReason};
pub use events::{ChainEvent, Direction, PushResult};
pub use locators::{locator_heights, LOCATORS_MAX_COUNT};
