//! # Quorum-Ledger Node
//!
//! Binary entry point. See [`node_runtime`] for the wiring.

use anyhow::{Context, Result};
use ledger_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{error, info};

use node_runtime::container::NodeConfig;
use node_runtime::NodeRuntime;

#[tokio::main]
async fn main() -> Result<()> {
    let _telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("failed to initialize telemetry")?;

    let config = NodeConfig::from_env().context("invalid configuration")?;
    let runtime = NodeRuntime::new(config).context("failed to wire node")?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Shutdown signal received, draining requests");
    };

    info!("Node is running. Press Ctrl+C to stop.");
    runtime.run(shutdown).await.context("node stopped with an error")
}
