//! # Node Container
//!
//! Builds every component of a node from a [`NodeConfig`] and holds the
//! shared handles.
//!
//! ```text
//! LedgerStore (file | memory)
//!      │
//! SharedLedger ──┬── SyncCoordinator ──┐
//!                └── PeerRpcService ───┴── RpcGateway
//!                          │
//!                 HttpPeerTransport (outbound)
//! ```

pub mod config;

pub use config::{ConfigError, NodeConfig};

use std::sync::Arc;

use ql_01_ledger_store::{
    FileLedgerStore, LedgerReader, LedgerStore, MemoryLedgerStore, StoreError,
};
use ql_02_peer_transport::{HttpPeerTransport, PeerTransport, TransportError};
use ql_03_chain_sync::{PeerRpcService, SharedLedger, SyncConfig, SyncCoordinator, SystemClock};
use ql_04_rpc_gateway::{GatewayError, RpcGateway};
use thiserror::Error;
use tracing::info;

/// Wiring failures.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// The ledger store could not be opened.
    #[error("ledger store: {0}")]
    Store(#[from] StoreError),

    /// The outbound transport could not be built.
    #[error("peer transport: {0}")]
    Transport(#[from] TransportError),

    /// The gateway rejected its configuration.
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),
}

/// All components of one node.
pub struct NodeContainer {
    /// Configuration the node was built from.
    pub config: NodeConfig,
    /// Underlying store.
    pub store: Arc<dyn LedgerStore>,
    /// Store plus mutation lock.
    pub ledger: Arc<SharedLedger>,
    /// Operator-triggered sync operations.
    pub coordinator: Arc<SyncCoordinator>,
    /// Peer-facing JSON-RPC methods.
    pub rpc: Arc<PeerRpcService>,
    /// HTTP surface.
    pub gateway: RpcGateway,
}

impl NodeContainer {
    /// Open the store and wire the node.
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        let store = open_store(&config)?;
        let transport: Arc<dyn PeerTransport> =
            Arc::new(HttpPeerTransport::new(&config.transport())?);
        let ledger = Arc::new(SharedLedger::new(Arc::clone(&store)));

        let sync_config =
            SyncConfig::new(config.peers.clone()).with_local_label(config.local_label());
        let coordinator = Arc::new(SyncCoordinator::new(
            sync_config,
            Arc::clone(&ledger),
            Arc::clone(&transport),
            Arc::new(SystemClock),
        ));
        let rpc = Arc::new(PeerRpcService::new(
            Arc::clone(&ledger),
            transport,
            config.peers.clone(),
        ));
        let gateway = RpcGateway::new(config.gateway.clone(), coordinator.clone(), rpc.clone())?;

        info!(
            peers = config.peers.len(),
            blocks = store.block_count()?,
            "[node] container ready"
        );

        Ok(Self {
            config,
            store,
            ledger,
            coordinator,
            rpc,
            gateway,
        })
    }
}

fn open_store(config: &NodeConfig) -> Result<Arc<dyn LedgerStore>, StoreError> {
    match &config.data_dir {
        Some(dir) => {
            info!(data_dir = %dir.display(), "[node] using file store");
            Ok(Arc::new(FileLedgerStore::open(dir)?))
        }
        None => {
            info!("[node] using in-memory store");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
    }
}
