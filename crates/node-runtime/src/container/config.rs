//! # Node Configuration
//!
//! Unified configuration for all subsystems and runtime parameters.
//!
//! Every section is optional in the TOML file; missing sections and fields
//! fall back to their defaults.
//!
//! ```toml
//! [identity]
//! name = "kestrel-1"
//!
//! [log]
//! filter = "info,kc_04_blockchain=debug"
//!
//! [agent]
//! sync_mode = "light"
//! ban_duration_secs = 3600
//!
//! [mempool]
//! min_fee = 1
//! ```

use std::path::Path;

use kc_01_block_model::GenesisConfig;
use kc_04_blockchain::BlockchainConfig;
use kc_06_consensus_agent::{AgentConfig, MempoolConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// Environment variable overriding [`LogConfig::filter`].
pub const LOG_FILTER_ENV: &str = "KESTREL_LOG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Who this node is.
    pub identity: NodeIdentity,
    /// Logging configuration.
    pub log: LogConfig,
    /// Consensus policy and fork budget.
    pub blockchain: BlockchainConfig,
    /// Genesis parameters; every node on a network must agree on them.
    pub genesis: GenesisConfig,
    /// Per-peer agent configuration.
    pub agent: AgentConfig,
    /// Mempool admission limits.
    pub mempool: MempoolConfig,
}

impl NodeConfig {
    /// Configuration for in-process test networks.
    pub fn for_testing() -> Self {
        Self {
            identity: NodeIdentity {
                name: "test-node".into(),
            },
            log: LogConfig::default(),
            blockchain: BlockchainConfig::for_testing(),
            genesis: testing_genesis(),
            agent: AgentConfig::for_testing(),
            mempool: MempoolConfig::for_testing(),
        }
    }

    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                info!(path = %path.display(), "Loaded configuration");
                Self::from_toml_str(&text)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(ConfigError::Io {
                path: path.display().to_string(),
                message: err.to_string(),
            }),
        }
    }
}

/// Same genesis parameters as the block model's test chains, so blocks built
/// with its test helpers are valid on a testing node.
fn testing_genesis() -> GenesisConfig {
    GenesisConfig {
        timestamp: 1_700_000_000,
        extra_data: b"test genesis".to_vec(),
        ..GenesisConfig::default()
    }
}

/// Node identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeIdentity {
    /// Name attached to every log line of this node.
    pub name: String,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            name: "kestrel".into(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directives.
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

impl LogConfig {
    /// Filter in effect: `KESTREL_LOG`, then `RUST_LOG`, then the configured
    /// directives.
    pub fn effective_filter(&self) -> String {
        Self::resolve(
            std::env::var(LOG_FILTER_ENV).ok(),
            std::env::var("RUST_LOG").ok(),
            &self.filter,
        )
    }

    fn resolve(kestrel: Option<String>, rust_log: Option<String>, configured: &str) -> String {
        kestrel
            .into_iter()
            .chain(rust_log)
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| configured.to_string())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read configuration {path}: {message}")]
    Io { path: String, message: String },

    /// The TOML does not describe a node configuration.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}
