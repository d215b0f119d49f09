//! # Node Container
//!
//! Configuration and the explicit node context holding every shared
//! subsystem instance.

pub mod config;
pub mod context;

pub use config::{ConfigError, LogConfig, NodeConfig, NodeIdentity, LOG_FILTER_ENV};
pub use context::{NodeContext, NodeError};
