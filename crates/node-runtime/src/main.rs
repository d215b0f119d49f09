//! # Kestrel-Chain Node
//!
//! Binary entry point.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (`KESTREL_CONFIG` or `kestrel.toml`; missing file
//!    means defaults)
//! 2. Install logging
//! 3. Build the node context on the configured genesis
//! 4. Start background tasks and wait for Ctrl-C

use anyhow::{Context, Result};
use node_runtime::{init_logging, NodeConfig, NodeContext};
use tracing::info;

const CONFIG_ENV: &str = "KESTREL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "kestrel.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = NodeConfig::load(&path).with_context(|| format!("loading {path}"))?;
    init_logging(&config.log).context("installing log subscriber")?;

    info!("===========================================");
    info!("  Kestrel-Chain Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let context = NodeContext::new(config).context("building node context")?;
    let relay = context.start();

    let chain = context.blockchain();
    info!(
        head = %chain.head_hash(),
        height = chain.height(),
        work = chain.total_work(),
        "Chain head"
    );

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;

    context.shutdown();
    relay.await.context("joining transaction relay")?;
    info!("Shutdown complete");
    Ok(())
}
