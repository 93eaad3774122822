//! # Test Utilities
//!
//! An in-process cluster: every node has its own memory store, ledger
//! lock, coordinator and RPC service, and they reach each other through a
//! [`LoopbackNetwork`] that calls the target node's service directly.
//! Nodes can be switched off to simulate outages.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use shared_types::{Block, Entry, PeerInfo, RpcRequest};

use ql_01_ledger_store::MemoryLedgerStore;
use ql_02_peer_transport::TransportError;

use crate::application::{PeerRpcService, SharedLedger, SyncCoordinator};
use crate::config::SyncConfig;
use crate::ports::{Clock, PeerRpcApi, PeerTransport};

/// JSON-RPC internal error code, used when a served call fails.
const INTERNAL_ERROR: i64 = -32603;

/// Routes calls to registered in-process services.
#[derive(Default, Clone)]
pub struct LoopbackNetwork {
    nodes: Arc<RwLock<HashMap<String, Arc<dyn PeerRpcApi>>>>,
    down: Arc<RwLock<HashSet<String>>>,
}

impl LoopbackNetwork {
    /// Empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `peer` with `service`.
    pub fn register(&self, peer: &PeerInfo, service: Arc<dyn PeerRpcApi>) {
        self.nodes.write().insert(peer.id(), service);
    }

    /// Take `peer` off or back on the network.
    pub fn set_down(&self, peer: &PeerInfo, down: bool) {
        if down {
            self.down.write().insert(peer.id());
        } else {
            self.down.write().remove(&peer.id());
        }
    }
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackNetwork")
            .field("nodes", &self.nodes.read().len())
            .field("down", &self.down.read().len())
            .finish()
    }
}

#[async_trait]
impl PeerTransport for LoopbackNetwork {
    async fn call(&self, peer: &PeerInfo, request: &RpcRequest) -> Result<Value, TransportError> {
        let offline = |reason: &str| TransportError::Unreachable {
            peer: peer.to_string(),
            reason: reason.to_string(),
        };
        if self.down.read().contains(&peer.id()) {
            return Err(offline("node is down"));
        }
        let service = self
            .nodes
            .read()
            .get(&peer.id())
            .cloned()
            .ok_or_else(|| offline("no such node"))?;

        service
            .handle(request.clone())
            .await
            .map_err(|err| TransportError::Rpc {
                peer: peer.to_string(),
                code: INTERNAL_ERROR,
                message: err.to_string(),
            })
    }
}

/// Clock returning fixed values.
#[derive(Debug, Clone)]
pub struct FixedClock {
    /// Returned by [`Clock::settime`].
    pub settime: String,
    /// Returned by [`Clock::timestamp`].
    pub timestamp: String,
}

impl Default for FixedClock {
    fn default() -> Self {
        Self {
            settime: "20240101000000".to_string(),
            timestamp: "1704067200000".to_string(),
        }
    }
}

impl Clock for FixedClock {
    fn settime(&self) -> String {
        self.settime.clone()
    }

    fn timestamp(&self) -> String {
        self.timestamp.clone()
    }
}

/// One node of a [`TestCluster`].
pub struct TestNode {
    /// Address the node is registered under.
    pub peer: PeerInfo,
    /// Its store, for seeding and inspection.
    pub store: Arc<MemoryLedgerStore>,
    /// Its ledger lock.
    pub ledger: Arc<SharedLedger>,
    /// Its sync operations.
    pub coordinator: Arc<SyncCoordinator>,
    /// Its served RPC methods.
    pub rpc: Arc<PeerRpcService>,
}

/// Fully connected in-process cluster.
pub struct TestCluster {
    /// The shared network.
    pub network: LoopbackNetwork,
    nodes: Vec<TestNode>,
}

impl TestCluster {
    /// `size` nodes named `node-0..`, each peered with all the others.
    pub fn new(size: usize) -> Self {
        let network = LoopbackNetwork::new();
        let addresses: Vec<PeerInfo> = (0..size)
            .map(|i| PeerInfo::new(format!("node-{i}"), 9000 + i as u16))
            .collect();
        let transport: Arc<dyn PeerTransport> = Arc::new(network.clone());

        let nodes = addresses
            .iter()
            .map(|peer| {
                let peers: Vec<PeerInfo> =
                    addresses.iter().filter(|p| *p != peer).cloned().collect();
                let store = Arc::new(MemoryLedgerStore::new());
                let ledger = Arc::new(SharedLedger::new(store.clone()));
                let coordinator = Arc::new(SyncCoordinator::new(
                    SyncConfig::new(peers.clone()).with_local_label(peer.to_string()),
                    Arc::clone(&ledger),
                    Arc::clone(&transport),
                    Arc::new(FixedClock::default()),
                ));
                let rpc = Arc::new(PeerRpcService::new(
                    Arc::clone(&ledger),
                    Arc::clone(&transport),
                    peers,
                ));
                network.register(peer, rpc.clone());
                TestNode {
                    peer: peer.clone(),
                    store,
                    ledger,
                    coordinator,
                    rpc,
                }
            })
            .collect();

        Self { network, nodes }
    }

    /// Node `index`.
    pub fn node(&self, index: usize) -> &TestNode {
        &self.nodes[index]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True for a cluster without nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Take node `index` off or back on the network.
    pub fn set_down(&self, index: usize, down: bool) {
        self.network.set_down(&self.nodes[index].peer, down);
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

/// A `new` entry with an `sku` payload field.
pub fn entry(sku: &str) -> Entry {
    let mut payload = Map::new();
    payload.insert("sku".to_string(), json!(sku));
    Entry::new(payload)
}

/// The genesis block every fixture chain starts from.
pub fn genesis() -> Block {
    let clock = FixedClock::default();
    Block::genesis(clock.settime, clock.timestamp).expect("genesis hashes")
}

/// Child of `parent`; `tag` becomes the timestamp so siblings differ.
pub fn child(parent: &Block, data: Vec<Entry>, tag: &str) -> Block {
    Block::child_of(parent, data, "20240101000001".to_string(), tag.to_string())
        .expect("block hashes")
}
