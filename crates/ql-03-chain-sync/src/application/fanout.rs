//! # Peer Fan-out
//!
//! One spawned task per peer, all joined before returning. No retries, no
//! early exit. Results come back in configured peer order, and a task that
//! dies counts as a failed call.

use std::sync::Arc;

use futures::future::join_all;
use ledger_telemetry::{log_peer_event, metric_inc, PEER_CALL_FAILURES};
use serde_json::Value;
use shared_types::{is_failure_marker, is_ok_reply, PeerInfo, RpcRequest};

use ql_02_peer_transport::TransportError;

use crate::ports::PeerTransport;

/// One peer's answer to a broadcast.
#[derive(Debug, Clone)]
pub struct PeerReply {
    /// Who answered.
    pub peer: PeerInfo,
    /// The call's result.
    pub result: Result<Value, TransportError>,
}

impl PeerReply {
    /// The result, unless the call failed or returned `"NG"`.
    pub fn answer(&self) -> Option<&Value> {
        self.result.as_ref().ok().filter(|v| !is_failure_marker(v))
    }

    /// True if the peer answered `"OK"`.
    pub fn is_ack(&self) -> bool {
        matches!(&self.result, Ok(v) if is_ok_reply(v))
    }
}

fn note_failure(peer: &PeerInfo, request: &RpcRequest, err: &TransportError) {
    log_peer_event!(warn, "ql-03", "peer call failed", peer, method = %request.method, error = %err);
    metric_inc!(PEER_CALL_FAILURES, &[request.method.as_str()]);
}

/// Call one peer, logging and counting a failure.
pub async fn call_peer(
    transport: &dyn PeerTransport,
    peer: &PeerInfo,
    request: &RpcRequest,
) -> Result<Value, TransportError> {
    let result = transport.call(peer, request).await;
    if let Err(err) = &result {
        note_failure(peer, request, err);
    }
    result
}

/// Send `request` to every peer in parallel and wait for all of them.
pub async fn broadcast(
    transport: &Arc<dyn PeerTransport>,
    peers: &[PeerInfo],
    request: &RpcRequest,
) -> Vec<PeerReply> {
    let tasks: Vec<_> = peers
        .iter()
        .cloned()
        .map(|peer| {
            let transport = Arc::clone(transport);
            let request = request.clone();
            tokio::spawn(async move { transport.call(&peer, &request).await })
        })
        .collect();

    join_all(tasks)
        .await
        .into_iter()
        .zip(peers)
        .map(|(joined, peer)| {
            let result = joined.unwrap_or_else(|e| {
                Err(TransportError::Unreachable {
                    peer: peer.to_string(),
                    reason: format!("call task failed: {e}"),
                })
            });
            if let Err(err) = &result {
                note_failure(peer, request, err);
            }
            PeerReply {
                peer: peer.clone(),
                result,
            }
        })
        .collect()
}
