//! # Inbound Ports
//!
//! Two driving APIs: operator-triggered sync operations and the peer RPC
//! method set this node serves.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::RpcRequest;

use crate::domain::{SyncError, SyncOutcome};

/// Sync operations. Each runs under the global ledger lock.
///
/// Non-fatal results (no quorum, no majority, nothing to do) come back as
/// [`SyncOutcome`]; `Err` is reserved for storage and encoding failures.
#[async_trait]
pub trait SyncApi: Send + Sync {
    /// Copy the first answering peer's delivered pool.
    async fn sync_pool(&self) -> Result<SyncOutcome, SyncError>;

    /// Reconcile the chain against the majority peer.
    async fn sync_blocks_by_majority(&self) -> Result<SyncOutcome, SyncError>;

    /// Audit, reconcile, then prune forks.
    async fn full_resync(&self) -> Result<SyncOutcome, SyncError>;

    /// Send undelivered pool entries to every peer.
    async fn propagate_undelivered_pool(&self) -> Result<SyncOutcome, SyncError>;

    /// Create and distribute the genesis block.
    async fn create_genesis(&self) -> Result<SyncOutcome, SyncError>;

    /// Prune every fork.
    async fn resolve_forks(&self) -> Result<SyncOutcome, SyncError>;

    /// Audit every block's hash and repair from the majority.
    async fn audit_chain(&self) -> Result<SyncOutcome, SyncError>;
}

/// Served peer RPC methods.
#[async_trait]
pub trait PeerRpcApi: Send + Sync {
    /// Serve one request and return its JSON-RPC `result`.
    async fn handle(&self, request: RpcRequest) -> Result<Value, SyncError>;
}
