//! # HTTP JSON-RPC Transport
//!
//! `POST http://host:port/checknode` with a JSON-RPC 2.0 envelope.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use shared_types::{JsonRpcRequest, JsonRpcResponse, PeerInfo, RpcRequest};

use crate::config::TransportConfig;
use crate::domain::TransportError;
use crate::ports::PeerTransport;

/// Path every node serves peer RPCs on.
pub const PEER_RPC_PATH: &str = "/checknode";

/// Peer transport over HTTP.
#[derive(Debug)]
pub struct HttpPeerTransport {
    client: reqwest::Client,
    auth_token: Option<String>,
    request_id: AtomicU64,
}

impl HttpPeerTransport {
    /// Build a client with the configured timeouts.
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.read_timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self {
            client,
            auth_token: config.auth_token.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    fn endpoint(peer: &PeerInfo) -> String {
        format!("http://{}:{}{}", peer.host, peer.port, PEER_RPC_PATH)
    }

    fn map_send_error(peer: &PeerInfo, err: reqwest::Error) -> TransportError {
        let peer = peer.to_string();
        if err.is_timeout() {
            TransportError::Timeout { peer }
        } else if err.is_connect() {
            TransportError::Connect {
                peer,
                reason: err.to_string(),
            }
        } else {
            TransportError::Unreachable {
                peer,
                reason: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl PeerTransport for HttpPeerTransport {
    async fn call(&self, peer: &PeerInfo, request: &RpcRequest) -> Result<Value, TransportError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let envelope = JsonRpcRequest::from_request(request, Value::from(id.to_string()));

        tracing::debug!(peer = %peer, method = %request.method, "[ql-02] → peer call");

        let mut builder = self.client.post(Self::endpoint(peer)).json(&envelope);
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_send_error(peer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                peer: peer.to_string(),
                status: status.as_u16(),
            });
        }

        let body: JsonRpcResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout {
                    peer: peer.to_string(),
                }
            } else {
                TransportError::InvalidResponse {
                    peer: peer.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        if let Some(error) = body.error {
            return Err(TransportError::Rpc {
                peer: peer.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        body.result.ok_or_else(|| TransportError::InvalidResponse {
            peer: peer.to_string(),
            reason: "response missing result".to_string(),
        })
    }
}
