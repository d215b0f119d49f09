//! # Adapters
//!
//! In-memory account tree and listener implementations.

pub mod accounts;
pub mod listeners;

pub use accounts::InMemoryAccountTree;
pub use listeners::{ChannelListener, RecordingListener};
