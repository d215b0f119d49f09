//! # Logging Bootstrap
//!
//! Installs the global `tracing` subscriber for the node process.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use crate::container::LogConfig;

/// Install a formatting subscriber filtered by [`LogConfig::effective_filter`].
///
/// Invalid directives fall back to `info`. Fails if a global subscriber is
/// already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let directives = config.effective_filter();
    let (filter, invalid) = match EnvFilter::try_new(&directives) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new("info"), Some(err)),
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(filter)
        .try_init()?;
    if let Some(err) = invalid {
        tracing::warn!(%directives, %err, "Invalid log filter, using info");
    }
    Ok(())
}
