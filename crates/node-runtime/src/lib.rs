//! # Quorum-Ledger Node Runtime
//!
//! Wires one node and serves it.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry
//! 2. Load configuration from `LQ_*` variables
//! 3. Open the ledger store (file or memory)
//! 4. Build transport, sync engine, peer RPC service and gateway
//! 5. Serve until the shutdown signal, then drain in-flight requests

pub mod container;

use std::future::Future;

use ql_04_rpc_gateway::GatewayError;
use thiserror::Error;
use tracing::info;

use crate::container::{ContainerError, NodeConfig, NodeContainer};

/// Node lifecycle failures.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Components could not be wired.
    #[error("failed to wire node: {0}")]
    Wiring(#[from] ContainerError),

    /// The gateway stopped with an error.
    #[error("gateway failed: {0}")]
    Gateway(#[from] GatewayError),
}

/// A fully wired node.
pub struct NodeRuntime {
    container: NodeContainer,
}

impl NodeRuntime {
    /// Build every component from `config`.
    pub fn new(config: NodeConfig) -> Result<Self, RuntimeError> {
        let container = NodeContainer::new(config)?;
        Ok(Self { container })
    }

    /// Components of this node.
    pub fn container(&self) -> &NodeContainer {
        &self.container
    }

    /// Serve the gateway until `shutdown` resolves.
    pub async fn run<F>(&self, shutdown: F) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = &self.container.config;
        info!("===========================================");
        info!("  Quorum-Ledger Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!("RPC: {}", config.gateway.bind_addr());
        info!("Peers: {}", config.peers.len());
        match &config.data_dir {
            Some(dir) => info!("Data Dir: {}", dir.display()),
            None => info!("Data Dir: <memory>"),
        }

        self.container.gateway.run(shutdown).await?;

        info!("Node stopped");
        Ok(())
    }
}
