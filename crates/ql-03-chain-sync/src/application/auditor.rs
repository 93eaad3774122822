//! # Tamper Auditor
//!
//! Recomputes every block hash in chain order. A mismatch is tampering:
//! the majority of peers is asked which copy of the block under the
//! stored hash is right, and the local block is replaced with the
//! majority peer's copy when that copy differs and verifies under the
//! same hash.

use std::sync::Arc;

use ledger_telemetry::{log_block_event, metric_inc, BLOCKS_REPAIRED, BLOCKS_UNREPAIRABLE};
use shared_types::{is_failure_marker, replies, Block, RpcMethod, RpcRequest};

use crate::application::fanout::call_peer;
use crate::application::resolver::MajorityResolver;
use crate::domain::{AuditOutcome, AuditReport, BlockAudit, Participant, Probe, SyncError};
use crate::ports::{LedgerStore, PeerTransport};

/// Audits and repairs the local chain.
pub struct TamperAuditor {
    resolver: Arc<MajorityResolver>,
    transport: Arc<dyn PeerTransport>,
}

impl TamperAuditor {
    /// Auditor using `resolver` to find the majority.
    pub fn new(resolver: Arc<MajorityResolver>, transport: Arc<dyn PeerTransport>) -> Self {
        Self {
            resolver,
            transport,
        }
    }

    /// Audit every block. The caller must hold the ledger lock.
    pub async fn audit_and_repair(&self, store: &dyn LedgerStore) -> Result<AuditReport, SyncError> {
        let mut report = AuditReport::default();

        for block in store.blocks()? {
            let outcome = if block.verify_hash()? {
                AuditOutcome::Clean
            } else {
                log_block_event!(warn, "ql-03", "tampered block detected", block.hash);
                let outcome = self.repair(store, &block).await?;
                match &outcome {
                    AuditOutcome::Repaired => {
                        log_block_event!(info, "ql-03", "tampered block repaired", block.hash);
                        metric_inc!(BLOCKS_REPAIRED);
                    }
                    AuditOutcome::Unrepairable(reason) => {
                        log_block_event!(warn, "ql-03", "tampered block left as is", block.hash, reason = %reason);
                        metric_inc!(BLOCKS_UNREPAIRABLE);
                    }
                    AuditOutcome::Clean => {}
                }
                outcome
            };
            report.blocks.push(BlockAudit {
                hash: block.hash,
                outcome,
            });
        }

        Ok(report)
    }

    async fn repair(&self, store: &dyn LedgerStore, local: &Block) -> Result<AuditOutcome, SyncError> {
        let majority = match self
            .resolver
            .resolve(&Probe::block_by_hash(local.hash.clone()))
            .await?
        {
            Ok(majority) => majority,
            Err(warning) => return Ok(AuditOutcome::Unrepairable(warning.to_string())),
        };
        let Participant::Remote(peer) = majority.participant else {
            return Ok(AuditOutcome::Unrepairable(
                "majority is this node".to_string(),
            ));
        };

        let request = RpcRequest::with_hash(RpcMethod::CheckBlockByHash, local.hash.clone());
        let reply = match call_peer(self.transport.as_ref(), &peer, &request).await {
            Ok(reply) => reply,
            Err(err) => {
                return Ok(AuditOutcome::Unrepairable(format!(
                    "majority peer {peer} unreachable: {err}"
                )))
            }
        };

        if reply.as_str() == Some(replies::BLOCK_NOT_FOUND) {
            return Ok(AuditOutcome::Unrepairable(
                "majority lacks this block".to_string(),
            ));
        }
        if is_failure_marker(&reply) {
            return Ok(AuditOutcome::Unrepairable(format!(
                "majority peer {peer} answered NG"
            )));
        }

        let majority_block: Block = match serde_json::from_value(reply) {
            Ok(block) => block,
            Err(err) => {
                return Ok(AuditOutcome::Unrepairable(format!(
                    "majority peer {peer} sent a malformed block: {err}"
                )))
            }
        };
        if majority_block.hash != local.hash {
            return Ok(AuditOutcome::Unrepairable(format!(
                "majority peer {peer} served block {} instead",
                majority_block.hash
            )));
        }
        if &majority_block == local {
            return Ok(AuditOutcome::Unrepairable(
                "tampered block matches majority, cannot tell which copy is correct".to_string(),
            ));
        }
        if !matches!(majority_block.verify_hash(), Ok(true)) {
            return Ok(AuditOutcome::Unrepairable(format!(
                "majority peer {peer} copy fails hash verification"
            )));
        }

        store.replace_block(&local.hash, majority_block)?;
        Ok(AuditOutcome::Repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ledger::SharedLedger;
    use crate::ports::LedgerReader;
    use ql_01_ledger_store::MemoryLedgerStore;
    use ql_02_peer_transport::MockPeerTransport;
    use serde_json::{json, Map, Value};
    use shared_types::{Entry, PeerInfo};

    fn peers() -> Vec<PeerInfo> {
        (1..=3).map(|i| PeerInfo::new(format!("n{i}"), 8080)).collect()
    }

    fn chain() -> Vec<Block> {
        let genesis = Block::genesis("20240101000000".into(), "0".into()).unwrap();
        let mut payload = Map::new();
        payload.insert("amount".into(), json!(10));
        let child =
            Block::child_of(&genesis, vec![Entry::new(payload)], "t".into(), "1".into()).unwrap();
        vec![genesis, child]
    }

    fn tamper(block: &Block) -> Block {
        let mut forged = block.clone();
        forged.data[0].payload.insert("amount".into(), json!(1_000_000));
        forged
    }

    fn setup(mock: MockPeerTransport) -> (Arc<MemoryLedgerStore>, TamperAuditor) {
        let store = Arc::new(MemoryLedgerStore::new());
        let ledger = Arc::new(SharedLedger::new(store.clone()));
        let transport: Arc<dyn PeerTransport> = Arc::new(mock);
        let resolver = Arc::new(MajorityResolver::new(ledger, transport.clone(), peers()));
        (store, TamperAuditor::new(resolver, transport))
    }

    fn all_peers_answer(mock: &MockPeerTransport, reply: Value) {
        for peer in peers() {
            mock.respond(&peer, RpcMethod::CheckBlockByHash, reply.clone());
        }
    }

    #[tokio::test]
    async fn test_clean_chain() {
        let (store, auditor) = setup(MockPeerTransport::new());
        for block in chain() {
            store.insert_block(block).unwrap();
        }
        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.tampered(), 0);
    }

    #[tokio::test]
    async fn test_tampered_block_repaired_from_majority() {
        let chain = chain();
        let mock = MockPeerTransport::new();
        all_peers_answer(&mock, serde_json::to_value(&chain[1]).unwrap());
        let (store, auditor) = setup(mock);
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(tamper(&chain[1])).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();
        assert_eq!(report.tampered(), 1);
        assert_eq!(report.repaired(), 1);
        assert_eq!(store.blocks().unwrap()[1], chain[1]);
    }

    #[tokio::test]
    async fn test_majority_with_same_tampered_copy_is_unrepairable() {
        let chain = chain();
        let forged = tamper(&chain[1]);
        let mock = MockPeerTransport::new();
        all_peers_answer(&mock, serde_json::to_value(&forged).unwrap());
        let (store, auditor) = setup(mock);
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(forged.clone()).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();
        assert_eq!(report.repaired(), 0);
        assert!(matches!(
            &report.blocks[1].outcome,
            AuditOutcome::Unrepairable(reason) if reason.contains("matches majority")
        ));
        assert_eq!(store.blocks().unwrap()[1], forged);
    }

    #[tokio::test]
    async fn test_majority_without_block_is_unrepairable() {
        let chain = chain();
        let mock = MockPeerTransport::new();
        all_peers_answer(&mock, json!("BLOCK_NOT_FOUND"));
        let (store, auditor) = setup(mock);
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(tamper(&chain[1])).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();
        assert_eq!(
            report.blocks[1].outcome,
            AuditOutcome::Unrepairable("majority lacks this block".into())
        );
    }

    fn three_block_chain() -> Vec<Block> {
        let mut blocks = chain();
        let mut payload = Map::new();
        payload.insert("amount".into(), json!(5));
        let next =
            Block::child_of(&blocks[1], vec![Entry::new(payload)], "t2".into(), "2".into()).unwrap();
        blocks.push(next);
        blocks
    }

    #[tokio::test]
    async fn test_majority_copy_under_other_hash_is_rejected() {
        let chain = three_block_chain();
        let mut relabelled = chain[1].clone();
        relabelled.hash = "bogus".to_string();
        let mock = MockPeerTransport::new();
        all_peers_answer(&mock, serde_json::to_value(&relabelled).unwrap());
        let (store, auditor) = setup(mock);
        let forged = tamper(&chain[1]);
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(forged.clone()).unwrap();
        store.insert_block(chain[2].clone()).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();

        assert_eq!(report.repaired(), 0);
        assert!(matches!(
            &report.blocks[1].outcome,
            AuditOutcome::Unrepairable(reason) if reason.contains("instead")
        ));
        let kept = store.blocks().unwrap();
        assert_eq!(kept[1], forged);
        assert!(store.block_by_hash(&kept[2].prev_hash).unwrap().is_found());
    }

    #[tokio::test]
    async fn test_malformed_majority_reply_is_unrepairable() {
        let chain = chain();
        let mock = MockPeerTransport::new();
        all_peers_answer(&mock, json!({"hash": 42}));
        let (store, auditor) = setup(mock);
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(tamper(&chain[1])).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();

        assert!(matches!(
            &report.blocks[1].outcome,
            AuditOutcome::Unrepairable(reason) if reason.contains("malformed")
        ));
    }

    #[tokio::test]
    async fn test_majority_copy_failing_verification_is_rejected() {
        let chain = chain();
        let mut other_forgery = chain[1].clone();
        other_forgery.data[0].payload.insert("amount".into(), json!(7));
        let mock = MockPeerTransport::new();
        all_peers_answer(&mock, serde_json::to_value(&other_forgery).unwrap());
        let (store, auditor) = setup(mock);
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(tamper(&chain[1])).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();

        assert!(matches!(
            &report.blocks[1].outcome,
            AuditOutcome::Unrepairable(reason) if reason.contains("fails hash verification")
        ));
        assert_eq!(store.blocks().unwrap()[1], tamper(&chain[1]));
    }

    #[tokio::test]
    async fn test_unreachable_peers_leave_block_unrepairable() {
        let chain = chain();
        let (store, auditor) = setup(MockPeerTransport::new());
        store.insert_block(chain[0].clone()).unwrap();
        store.insert_block(tamper(&chain[1])).unwrap();

        let report = auditor.audit_and_repair(store.as_ref()).await.unwrap();
        assert!(matches!(
            &report.blocks[1].outcome,
            AuditOutcome::Unrepairable(reason) if reason.contains("insufficient quorum")
        ));
        assert_eq!(report.blocks[0].outcome, AuditOutcome::Clean);
    }
}
