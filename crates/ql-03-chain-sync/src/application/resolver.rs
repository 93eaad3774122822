//! # Majority Resolver
//!
//! Asks every participant the same question and names the one whose
//! answer the most others share. Snapshot probes include this node, which
//! answers from its own store and is listed first, so a node that already
//! agrees with the majority resolves to [`Participant::Local`].

use std::sync::Arc;

use ledger_telemetry::log_peer_event;
use serde_json::Value;
use shared_types::{is_failure_marker, PeerInfo};

use crate::algorithms::select_majority;
use crate::application::fanout::broadcast;
use crate::application::ledger::SharedLedger;
use crate::application::queries;
use crate::domain::{Majority, Participant, Probe, Resolution, SyncError};
use crate::ports::PeerTransport;

/// Resolves probes against the configured peers.
pub struct MajorityResolver {
    ledger: Arc<SharedLedger>,
    transport: Arc<dyn PeerTransport>,
    peers: Vec<PeerInfo>,
}

impl MajorityResolver {
    /// Resolver over `peers`.
    pub fn new(
        ledger: Arc<SharedLedger>,
        transport: Arc<dyn PeerTransport>,
        peers: Vec<PeerInfo>,
    ) -> Self {
        Self {
            ledger,
            transport,
            peers,
        }
    }

    /// Configured peers.
    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    /// Fan `probe` out and pick the majority.
    ///
    /// `Err` only for a local storage failure; quorum loss and ties are
    /// the `Err` side of the returned [`Resolution`].
    pub async fn resolve(&self, probe: &Probe) -> Result<Resolution, SyncError> {
        let request = probe.request();

        let mut participants = Vec::with_capacity(self.peers.len() + 1);
        let mut answers: Vec<Option<Value>> = Vec::with_capacity(self.peers.len() + 1);

        if probe.includes_local() {
            let local = queries::answer(self.ledger.reader(), &request)?;
            participants.push(Participant::Local);
            answers.push(Some(local).filter(|v| !is_failure_marker(v)));
        }

        for reply in broadcast(&self.transport, &self.peers, &request).await {
            if matches!(&reply.result, Ok(v) if is_failure_marker(v)) {
                log_peer_event!(warn, "ql-03", "peer answered NG", reply.peer, method = %request.method);
            }
            answers.push(reply.answer().cloned());
            participants.push(Participant::Remote(reply.peer));
        }

        match select_majority(&answers) {
            Ok(winner) => {
                let participant = participants[winner.index].clone();
                tracing::info!(
                    method = %request.method,
                    majority = %participant,
                    agreeing = winner.agreeing,
                    responded = winner.responded,
                    "[ql-03] majority resolved"
                );
                let response = answers[winner.index].take().unwrap_or(Value::Null);
                Ok(Ok(Majority {
                    participant,
                    agreeing: winner.agreeing,
                    responded: winner.responded,
                    response,
                }))
            }
            Err(warning) => {
                tracing::warn!(method = %request.method, %warning, "[ql-03] majority not resolved");
                Ok(Err(warning))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MajorityWarning;
    use ql_01_ledger_store::{LedgerStore, MemoryLedgerStore};
    use ql_02_peer_transport::MockPeerTransport;
    use serde_json::json;
    use shared_types::{Block, RpcMethod};

    fn peers() -> Vec<PeerInfo> {
        (1..=3).map(|i| PeerInfo::new(format!("n{i}"), 8080)).collect()
    }

    fn resolver(store: MemoryLedgerStore, mock: MockPeerTransport) -> MajorityResolver {
        let ledger = Arc::new(SharedLedger::new(Arc::new(store)));
        MajorityResolver::new(ledger, Arc::new(mock), peers())
    }

    fn genesis() -> Block {
        Block::genesis("20240101000000".into(), "0".into()).unwrap()
    }

    #[tokio::test]
    async fn test_two_identical_block_answers_win() {
        let peers = peers();
        let mock = MockPeerTransport::new();
        mock.respond(&peers[0], RpcMethod::CheckBlockByHash, json!({"hash": "good"}));
        mock.respond(&peers[1], RpcMethod::CheckBlockByHash, json!({"hash": "evil"}));
        mock.respond(&peers[2], RpcMethod::CheckBlockByHash, json!({"hash": "good"}));

        let majority = resolver(MemoryLedgerStore::new(), mock)
            .resolve(&Probe::block_by_hash("good"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(majority.participant, Participant::Remote(peers[0].clone()));
        assert_eq!(majority.agreeing, 2);
        assert_eq!(majority.response, json!({"hash": "good"}));
    }

    #[tokio::test]
    async fn test_one_of_three_reachable_is_insufficient() {
        let peers = peers();
        let mock = MockPeerTransport::new();
        mock.respond(&peers[0], RpcMethod::CheckBlockByHash, json!("BLOCK_NOT_FOUND"));

        let resolution = resolver(MemoryLedgerStore::new(), mock)
            .resolve(&Probe::block_by_hash("h"))
            .await
            .unwrap();
        assert_eq!(
            resolution,
            Err(MajorityWarning::InsufficientQuorum {
                responded: 1,
                total: 3
            })
        );
    }

    #[tokio::test]
    async fn test_ng_answers_do_not_count() {
        let peers = peers();
        let mock = MockPeerTransport::new();
        mock.respond(&peers[0], RpcMethod::CheckBlockByHash, json!("NG"));
        mock.respond(&peers[1], RpcMethod::CheckBlockByHash, json!("NG"));
        mock.respond(&peers[2], RpcMethod::CheckBlockByHash, json!("BLOCK_NOT_FOUND"));

        let resolution = resolver(MemoryLedgerStore::new(), mock)
            .resolve(&Probe::block_by_hash("h"))
            .await
            .unwrap();
        assert!(matches!(
            resolution,
            Err(MajorityWarning::InsufficientQuorum { responded: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_local_in_majority_for_snapshot_probe() {
        let store = MemoryLedgerStore::new();
        store.insert_block(genesis()).unwrap();
        let local_copy = json!({ "block": [genesis()] });

        let peers = peers();
        let mock = MockPeerTransport::new();
        mock.respond(&peers[0], RpcMethod::CopyBlock, json!({ "block": [] }));
        mock.respond(&peers[1], RpcMethod::CopyBlock, local_copy.clone());
        mock.respond(&peers[2], RpcMethod::CopyBlock, local_copy);

        let majority = resolver(store, mock)
            .resolve(&Probe::snapshot(RpcMethod::CopyBlock))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(majority.participant, Participant::Local);
        assert_eq!(majority.agreeing, 3);
        assert_eq!(majority.responded, 4);
    }

    #[tokio::test]
    async fn test_snapshot_tie_is_no_majority() {
        let store = MemoryLedgerStore::new();
        store.insert_block(genesis()).unwrap();

        let peers = peers();
        let mock = MockPeerTransport::new();
        mock.respond(&peers[0], RpcMethod::CopyBlock, json!({ "block": [] }));
        mock.respond(&peers[1], RpcMethod::CopyBlock, json!({ "block": [] }));
        mock.respond(&peers[2], RpcMethod::CopyBlock, json!({ "block": [genesis()] }));

        let resolution = resolver(store, mock)
            .resolve(&Probe::snapshot(RpcMethod::CopyBlock))
            .await
            .unwrap();
        assert_eq!(resolution, Err(MajorityWarning::NoMajority));
    }
}
