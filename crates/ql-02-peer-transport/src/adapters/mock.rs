//! # Mock Transport
//!
//! Scripted replies keyed by peer and method. Anything unscripted fails as
//! unreachable, so a test only describes the peers it cares about.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{PeerInfo, RpcMethod, RpcRequest};

use crate::domain::TransportError;
use crate::ports::PeerTransport;

/// Computes a reply from the request params.
pub type Responder = Arc<dyn Fn(&Value) -> Result<Value, TransportError> + Send + Sync>;

/// Scripted in-memory transport.
#[derive(Default, Clone)]
pub struct MockPeerTransport {
    responders: Arc<RwLock<HashMap<(String, RpcMethod), Responder>>>,
    down: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<(String, RpcRequest)>>>,
}

impl MockPeerTransport {
    /// Transport with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to `method` on `peer` with a fixed value.
    pub fn respond(&self, peer: &PeerInfo, method: RpcMethod, reply: Value) -> &Self {
        self.respond_with(peer, method, move |_| Ok(reply.clone()))
    }

    /// Reply to `method` on `peer` by running `responder` on the params.
    pub fn respond_with<F>(&self, peer: &PeerInfo, method: RpcMethod, responder: F) -> &Self
    where
        F: Fn(&Value) -> Result<Value, TransportError> + Send + Sync + 'static,
    {
        self.responders
            .write()
            .insert((peer.id(), method), Arc::new(responder));
        self
    }

    /// Make `method` on `peer` fail with a timeout.
    pub fn fail(&self, peer: &PeerInfo, method: RpcMethod) -> &Self {
        let name = peer.to_string();
        self.respond_with(peer, method, move |_| {
            Err(TransportError::Timeout { peer: name.clone() })
        })
    }

    /// Make every call to `peer` fail.
    pub fn fail_peer(&self, peer: &PeerInfo) -> &Self {
        self.down.write().insert(peer.id());
        self
    }

    /// Every call made so far, as `(peer id, request)`.
    pub fn calls(&self) -> Vec<(String, RpcRequest)> {
        self.calls.read().clone()
    }

    /// Calls of `method` made so far.
    pub fn calls_to(&self, method: RpcMethod) -> Vec<(String, RpcRequest)> {
        self.calls
            .read()
            .iter()
            .filter(|(_, r)| r.method == method)
            .cloned()
            .collect()
    }
}

impl std::fmt::Debug for MockPeerTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockPeerTransport")
            .field("scripted", &self.responders.read().len())
            .field("down", &self.down.read().len())
            .field("calls", &self.calls.read().len())
            .finish()
    }
}

#[async_trait]
impl PeerTransport for MockPeerTransport {
    async fn call(&self, peer: &PeerInfo, request: &RpcRequest) -> Result<Value, TransportError> {
        self.calls.write().push((peer.id(), request.clone()));

        if self.down.read().contains(&peer.id()) {
            return Err(TransportError::Unreachable {
                peer: peer.to_string(),
                reason: "peer marked down".to_string(),
            });
        }

        let responder = self
            .responders
            .read()
            .get(&(peer.id(), request.method))
            .cloned();
        match responder {
            Some(responder) => responder(&request.params),
            None => Err(TransportError::Unreachable {
                peer: peer.to_string(),
                reason: format!("no scripted reply for {}", request.method),
            }),
        }
    }
}
