//! # Outbound Ports
//!
//! The sync engine depends on this trait only, never on a concrete client.

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{PeerInfo, RpcRequest};

use crate::domain::TransportError;

/// One request to one peer.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Send `request` to `peer` and return the JSON-RPC `result`.
    async fn call(&self, peer: &PeerInfo, request: &RpcRequest) -> Result<Value, TransportError>;
}
