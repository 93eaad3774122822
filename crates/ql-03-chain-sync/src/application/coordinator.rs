//! # Sync Coordinator
//!
//! Operator-triggered reconciliation of pool and chain with the peers.
//! Every operation takes the global ledger lock for its whole duration,
//! so no two passes overlap and no inbound peer message lands mid-pass.
//!
//! ## Operations
//!
//! | Operation | Steps |
//! |-----------|-------|
//! | `sync_pool` | probe `copyPool`, copy the first answering peer's delivered pool |
//! | `sync_blocks_by_majority` | resolve `copyBlock`, diff hash lists with the majority peer |
//! | `full_resync` | tamper audit, block diff, fork pruning, in that order |
//! | `propagate_undelivered_pool` | push undelivered entries, mark them delivered |
//! | `create_genesis` | build the root block once the whole cluster is empty |
//! | `resolve_forks` | fork pruning alone |
//! | `audit_chain` | tamper audit alone |

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use ledger_telemetry::{log_event, log_peer_event, metric_inc, SYNC_OPERATIONS};
use shared_types::{
    is_failure_marker, Block, ChainSnapshot, HashList, PeerInfo, PoolSnapshot, RpcMethod,
    RpcRequest,
};

use crate::application::auditor::TamperAuditor;
use crate::application::fanout::{broadcast, call_peer};
use crate::application::fork_resolver::ForkResolver;
use crate::application::ledger::SharedLedger;
use crate::application::resolver::MajorityResolver;
use crate::config::SyncConfig;
use crate::domain::{
    invariant_committed_not_pending, BlockDiffReport, Participant, PoolSyncReport, Probe,
    SyncError, SyncOutcome,
};
use crate::ports::{Clock, LedgerStore, PeerTransport, SyncApi};

/// Runs the sync operations of one node.
pub struct SyncCoordinator {
    config: SyncConfig,
    ledger: Arc<SharedLedger>,
    transport: Arc<dyn PeerTransport>,
    resolver: Arc<MajorityResolver>,
    auditor: TamperAuditor,
    forks: ForkResolver,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    /// Wire the engine components over one ledger and transport.
    pub fn new(
        config: SyncConfig,
        ledger: Arc<SharedLedger>,
        transport: Arc<dyn PeerTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = Arc::new(MajorityResolver::new(
            Arc::clone(&ledger),
            Arc::clone(&transport),
            config.peers.clone(),
        ));
        let auditor = TamperAuditor::new(Arc::clone(&resolver), Arc::clone(&transport));
        let forks = ForkResolver::new(Arc::clone(&transport), config.peers.clone());
        Self {
            config,
            ledger,
            transport,
            resolver,
            auditor,
            forks,
            clock,
        }
    }

    /// The ledger this coordinator synchronizes.
    pub fn ledger(&self) -> &Arc<SharedLedger> {
        &self.ledger
    }

    /// Configuration in use.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The majority resolver, shared with the auditor.
    pub fn resolver(&self) -> &Arc<MajorityResolver> {
        &self.resolver
    }

    // =========================================================================
    // POOL
    // =========================================================================

    async fn pool_sync(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        let probe = broadcast(
            &self.transport,
            &self.config.peers,
            &RpcRequest::new(RpcMethod::CopyPool),
        )
        .await;
        if !probe.iter().any(|reply| reply.answer().is_some()) {
            return Ok(SyncOutcome::ng("no peer reachable for pool sync"));
        }

        match self.diff_pool(store).await? {
            Some(report) => Ok(SyncOutcome::ok(report)),
            None => Ok(SyncOutcome::ng("no peer returned a pool snapshot")),
        }
    }

    /// Apply the first valid delivered-pool snapshot, asking peers one at
    /// a time in configured order.
    async fn diff_pool(&self, store: &dyn LedgerStore) -> Result<Option<PoolSyncReport>, SyncError> {
        let request = RpcRequest::new(RpcMethod::CopyPool);

        for peer in &self.config.peers {
            let reply = match call_peer(self.transport.as_ref(), peer, &request).await {
                Ok(reply) if !is_failure_marker(&reply) => reply,
                _ => continue,
            };
            let snapshot: PoolSnapshot = match serde_json::from_value(reply) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    log_peer_event!(warn, "ql-03", "malformed pool snapshot", peer, error = %err);
                    continue;
                }
            };

            let purged = store.remove_delivered_pool_entries()?;
            let mut copied = 0;
            for entry in snapshot.pool {
                if store.find_entry(&entry.id)?.is_found() {
                    continue;
                }
                store.insert_pool_entry(entry.into_delivered())?;
                copied += 1;
            }
            return Ok(Some(PoolSyncReport {
                source: peer.clone(),
                purged,
                copied,
            }));
        }

        Ok(None)
    }

    async fn propagate(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        let pending = store.undelivered_pool()?;
        if pending.is_empty() {
            return Ok(SyncOutcome::ok("no undelivered entries"));
        }

        let request = RpcRequest::receive_pool(&pending)?;
        let acks = broadcast(&self.transport, &self.config.peers, &request)
            .await
            .iter()
            .filter(|reply| reply.is_ack())
            .count();
        if acks == 0 {
            return Ok(SyncOutcome::ng("could not propagate to any peer"));
        }

        let ids: Vec<String> = pending.into_iter().map(|e| e.id).collect();
        let marked = store.mark_delivered(&ids)?;
        Ok(SyncOutcome::ok(format!(
            "{marked} entries delivered, {acks} of {} peers acknowledged",
            self.config.peers.len()
        )))
    }

    // =========================================================================
    // CHAIN
    // =========================================================================

    async fn blocks_by_majority(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        let majority = match self
            .resolver
            .resolve(&Probe::snapshot(RpcMethod::CopyBlock))
            .await?
        {
            Ok(majority) => majority,
            Err(warning) => return Ok(SyncOutcome::ng(warning)),
        };

        let report = match majority.participant {
            Participant::Local => BlockDiffReport::in_majority(),
            Participant::Remote(peer) => {
                let Some(remote) = self.fetch_hash_list(&peer).await else {
                    return Ok(SyncOutcome::ng(format!(
                        "could not fetch hash list from {peer}"
                    )));
                };
                self.diff_blocks(store, peer, remote).await?
            }
        };

        let overlap = invariant_committed_not_pending(&store.blocks()?, &store.pool_entries()?);
        if !overlap.is_empty() {
            tracing::error!(
                count = overlap.len(),
                first = %overlap[0],
                "[ql-03] committed entries still pending in pool"
            );
        }

        if report.failed.is_empty() {
            Ok(SyncOutcome::ok(report))
        } else {
            Ok(SyncOutcome::ng(report))
        }
    }

    async fn fetch_hash_list(&self, peer: &PeerInfo) -> Option<Vec<String>> {
        let reply = call_peer(
            self.transport.as_ref(),
            peer,
            &RpcRequest::new(RpcMethod::GetHashList),
        )
        .await
        .ok()?;
        match serde_json::from_value::<HashList>(reply) {
            Ok(list) => Some(list.hash),
            Err(err) => {
                log_peer_event!(warn, "ql-03", "malformed hash list", peer, error = %err);
                None
            }
        }
    }

    async fn fetch_block(&self, peer: &PeerInfo, hash: &str) -> Option<Block> {
        let request = RpcRequest::with_hash(RpcMethod::CheckBlockByHash, hash);
        let reply = call_peer(self.transport.as_ref(), peer, &request).await.ok()?;
        if let Some(marker) = reply.as_str() {
            log_peer_event!(warn, "ql-03", "listed block not served", peer, hash, reply = marker);
            return None;
        }
        match serde_json::from_value::<Block>(reply) {
            Ok(block) if block.hash == hash => Some(block),
            Ok(block) => {
                log_peer_event!(warn, "ql-03", "peer served a different block", peer, hash, served = %block.hash);
                None
            }
            Err(err) => {
                log_peer_event!(warn, "ql-03", "malformed block", peer, hash, error = %err);
                None
            }
        }
    }

    /// Make the local chain hold exactly the blocks `peer` lists.
    async fn diff_blocks(
        &self,
        store: &dyn LedgerStore,
        peer: PeerInfo,
        remote: Vec<String>,
    ) -> Result<BlockDiffReport, SyncError> {
        let local = store.hash_list()?;
        let local_set: HashSet<&str> = local.iter().map(String::as_str).collect();
        let remote_set: HashSet<&str> = remote.iter().map(String::as_str).collect();

        let mut report = BlockDiffReport {
            source: Participant::Remote(peer.clone()),
            added: Vec::new(),
            removed: Vec::new(),
            failed: Vec::new(),
        };

        for hash in local.iter().filter(|h| !remote_set.contains(h.as_str())) {
            if store.remove_block(hash)?.is_found() {
                report.removed.push(hash.clone());
            }
        }

        let mut seen = HashSet::new();
        for hash in remote
            .iter()
            .filter(|h| !local_set.contains(h.as_str()) && seen.insert(h.as_str()))
        {
            let Some(block) = self.fetch_block(&peer, hash).await else {
                report.failed.push(hash.clone());
                continue;
            };
            let committed: Vec<String> = if block.is_genesis() {
                Vec::new()
            } else {
                block.entry_ids().map(str::to_string).collect()
            };
            store.insert_block(block)?;
            for id in &committed {
                store.remove_pool_entry(id)?;
            }
            report.added.push(hash.clone());
        }

        Ok(report)
    }

    async fn full_resync_locked(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        let audit = self.auditor.audit_and_repair(store).await?;
        let blocks = self.blocks_by_majority(store).await?;
        let forks = self.forks.resolve_all(store).await?;

        let detail = format!("{audit}\n{}\n{forks}", blocks.detail());
        if blocks.is_ok() && forks.is_complete() && audit.unrepairable().next().is_none() {
            Ok(SyncOutcome::Ok(detail))
        } else {
            Ok(SyncOutcome::Ng(detail))
        }
    }

    async fn genesis(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        if store.block_count()? > 0 {
            return Ok(SyncOutcome::ng("local chain already has blocks"));
        }

        let probe = broadcast(
            &self.transport,
            &self.config.peers,
            &RpcRequest::new(RpcMethod::CopyBlock),
        )
        .await;
        for reply in &probe {
            let Some(answer) = reply.answer() else {
                return Ok(SyncOutcome::ng(format!("peer {} unreachable", reply.peer)));
            };
            match serde_json::from_value::<ChainSnapshot>(answer.clone()) {
                Ok(snapshot) if snapshot.block.is_empty() => {}
                Ok(_) => {
                    return Ok(SyncOutcome::ng(format!(
                        "peer {} already has blocks",
                        reply.peer
                    )))
                }
                Err(_) => {
                    return Ok(SyncOutcome::ng(format!(
                        "peer {} returned an invalid chain snapshot",
                        reply.peer
                    )))
                }
            }
        }

        let genesis = Block::genesis(self.clock.settime(), self.clock.timestamp())?;
        store.insert_block(genesis.clone())?;

        let request = RpcRequest::with_block(RpcMethod::ReceiveBlock, &genesis)?;
        for reply in broadcast(&self.transport, &self.config.peers, &request).await {
            if !reply.is_ack() {
                log_peer_event!(warn, "ql-03", "peer did not accept genesis", reply.peer);
            }
        }
        Ok(SyncOutcome::ok(format!("genesis {}", genesis.hash)))
    }

    async fn forks_locked(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        if !self.forks.has_fork(store.as_reader())? {
            return Ok(SyncOutcome::ok("no fork"));
        }
        let report = self.forks.resolve_all(store).await?;
        if report.is_complete() {
            Ok(SyncOutcome::ok(report))
        } else {
            Ok(SyncOutcome::ng(report))
        }
    }

    async fn audit_locked(&self, store: &dyn LedgerStore) -> Result<SyncOutcome, SyncError> {
        let report = self.auditor.audit_and_repair(store).await?;
        if report.unrepairable().next().is_none() {
            Ok(SyncOutcome::ok(report))
        } else {
            Ok(SyncOutcome::ng(report))
        }
    }
}

fn record(node: &str, operation: &'static str, result: &Result<SyncOutcome, SyncError>) {
    match result {
        Ok(outcome) => {
            metric_inc!(SYNC_OPERATIONS, &[operation, outcome.label()]);
            log_event!(info, "ql-03", "sync operation finished", node, operation, outcome = %outcome);
        }
        Err(err) => {
            metric_inc!(SYNC_OPERATIONS, &[operation, "error"]);
            log_event!(error, "ql-03", "sync operation failed", node, operation, error = %err);
        }
    }
}

#[async_trait]
impl SyncApi for SyncCoordinator {
    async fn sync_pool(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.pool_sync(&*store).await;
        record(&self.config.local_label, "sync_pool", &result);
        result
    }

    async fn sync_blocks_by_majority(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.blocks_by_majority(&*store).await;
        record(&self.config.local_label, "sync_blocks", &result);
        result
    }

    async fn full_resync(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.full_resync_locked(&*store).await;
        record(&self.config.local_label, "full_resync", &result);
        result
    }

    async fn propagate_undelivered_pool(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.propagate(&*store).await;
        record(&self.config.local_label, "propagate_pool", &result);
        result
    }

    async fn create_genesis(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.genesis(&*store).await;
        record(&self.config.local_label, "create_genesis", &result);
        result
    }

    async fn resolve_forks(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.forks_locked(&*store).await;
        record(&self.config.local_label, "resolve_forks", &result);
        result
    }

    async fn audit_chain(&self) -> Result<SyncOutcome, SyncError> {
        let store = self.ledger.lock().await;
        let result = self.audit_locked(&*store).await;
        record(&self.config.local_label, "audit_chain", &result);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::LedgerReader;
    use crate::test_utils::{child, entry, genesis, FixedClock, TestCluster};
    use ql_01_ledger_store::MemoryLedgerStore;
    use ql_02_peer_transport::MockPeerTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_genesis_reaches_every_node() {
        let cluster = TestCluster::new(3);
        let outcome = cluster.node(0).coordinator.create_genesis().await.unwrap();
        assert!(outcome.is_ok(), "{outcome}");

        let root = cluster.node(0).store.blocks().unwrap()[0].clone();
        assert!(root.is_genesis());
        for i in 1..3 {
            assert_eq!(cluster.node(i).store.blocks().unwrap(), vec![root.clone()]);
        }
    }

    #[tokio::test]
    async fn test_create_genesis_refused_when_a_peer_has_blocks() {
        let cluster = TestCluster::new(3);
        cluster.node(2).store.insert_block(genesis()).unwrap();

        let outcome = cluster.node(0).coordinator.create_genesis().await.unwrap();
        assert!(!outcome.is_ok());
        assert!(outcome.detail().contains("already has blocks"));
        assert_eq!(cluster.node(0).store.block_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_genesis_refused_when_a_peer_is_down() {
        let cluster = TestCluster::new(3);
        cluster.set_down(1, true);

        let outcome = cluster.node(0).coordinator.create_genesis().await.unwrap();
        assert!(outcome.detail().contains("unreachable"));
    }

    #[tokio::test]
    async fn test_block_diff_copies_missing_blocks_and_clears_pool() {
        let cluster = TestCluster::new(3);
        let root = genesis();
        let sold = entry("widget");
        let b1 = child(&root, vec![sold.clone()], "b1");
        for i in 0..3 {
            cluster.node(i).store.insert_block(root.clone()).unwrap();
        }
        for i in 1..3 {
            cluster.node(i).store.insert_block(b1.clone()).unwrap();
        }
        cluster.node(0).store.insert_pool_entry(sold.clone()).unwrap();

        let outcome = cluster
            .node(0)
            .coordinator
            .sync_blocks_by_majority()
            .await
            .unwrap();
        assert!(outcome.is_ok(), "{outcome}");
        assert!(outcome.detail().contains("1 added, 0 removed"));
        assert_eq!(cluster.node(0).store.hash_list().unwrap(), vec![root.hash, b1.hash]);
        assert!(cluster.node(0).store.pool_entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_block_diff_removes_local_only_blocks() {
        let cluster = TestCluster::new(3);
        let root = genesis();
        let stray = child(&root, vec![entry("stray")], "stray");
        for i in 0..3 {
            cluster.node(i).store.insert_block(root.clone()).unwrap();
        }
        cluster.node(0).store.insert_block(stray).unwrap();

        let outcome = cluster
            .node(0)
            .coordinator
            .sync_blocks_by_majority()
            .await
            .unwrap();
        assert!(outcome.detail().contains("0 added, 1 removed"), "{outcome}");
        assert_eq!(cluster.node(0).store.block_count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_block_diff_in_majority_is_a_no_op() {
        let cluster = TestCluster::new(3);
        for i in 0..3 {
            cluster.node(i).store.insert_block(genesis()).unwrap();
        }
        let outcome = cluster
            .node(0)
            .coordinator
            .sync_blocks_by_majority()
            .await
            .unwrap();
        assert_eq!(
            outcome.to_string(),
            "OK:block diff: local chain holds the majority view, no diff"
        );
    }

    #[tokio::test]
    async fn test_block_diff_with_unfetchable_block_is_ng() {
        let peers: Vec<PeerInfo> = (1..=2).map(|i| PeerInfo::new(format!("n{i}"), 8080)).collect();
        let root = genesis();
        let mock = MockPeerTransport::new();
        for peer in &peers {
            mock.respond(peer, RpcMethod::CopyBlock, json!({ "block": [root.clone()] }));
            mock.respond(peer, RpcMethod::GetHashList, json!({ "hash": [root.hash.clone()] }));
        }
        let store = Arc::new(MemoryLedgerStore::new());
        let coordinator = SyncCoordinator::new(
            SyncConfig::new(peers),
            Arc::new(SharedLedger::new(store.clone())),
            Arc::new(mock),
            Arc::new(FixedClock::default()),
        );

        let outcome = coordinator.sync_blocks_by_majority().await.unwrap();

        assert!(!outcome.is_ok());
        assert!(outcome.detail().contains("1 not fetched"), "{outcome}");
        assert_eq!(store.block_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_block_diff_without_quorum_is_ng() {
        let cluster = TestCluster::new(5);
        for i in 1..5 {
            cluster.set_down(i, true);
        }
        let outcome = cluster
            .node(0)
            .coordinator
            .sync_blocks_by_majority()
            .await
            .unwrap();
        assert!(outcome.to_string().starts_with("NG:insufficient quorum"));
    }

    #[tokio::test]
    async fn test_pool_sync_copies_first_peer_snapshot() {
        let cluster = TestCluster::new(3);
        let mut shared = entry("shared");
        shared.delivered = true;
        let stale = entry("stale").into_delivered();
        let local_pending = entry("pending");
        cluster.node(1).store.insert_pool_entry(shared.clone()).unwrap();
        cluster.node(0).store.insert_pool_entry(stale.clone()).unwrap();
        cluster.node(0).store.insert_pool_entry(local_pending.clone()).unwrap();

        let outcome = cluster.node(0).coordinator.sync_pool().await.unwrap();
        assert!(outcome.is_ok(), "{outcome}");

        let ids = cluster.node(0).store.pool_ids().unwrap();
        assert!(ids.contains(&shared.id));
        assert!(ids.contains(&local_pending.id));
        assert!(!ids.contains(&stale.id));
    }

    #[tokio::test]
    async fn test_pool_sync_with_every_peer_down() {
        let cluster = TestCluster::new(3);
        cluster.set_down(1, true);
        cluster.set_down(2, true);
        let outcome = cluster.node(0).coordinator.sync_pool().await.unwrap();
        assert!(!outcome.is_ok());
    }

    #[tokio::test]
    async fn test_propagation_marks_entries_delivered() {
        let cluster = TestCluster::new(3);
        let fresh = entry("fresh");
        cluster.node(0).store.insert_pool_entry(fresh.clone()).unwrap();

        let outcome = cluster
            .node(0)
            .coordinator
            .propagate_undelivered_pool()
            .await
            .unwrap();
        assert!(outcome.is_ok(), "{outcome}");
        assert!(cluster.node(0).store.undelivered_pool().unwrap().is_empty());
        for i in 1..3 {
            assert_eq!(cluster.node(i).store.delivered_pool().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_propagation_fails_when_nobody_acks() {
        let cluster = TestCluster::new(3);
        cluster.set_down(1, true);
        cluster.set_down(2, true);
        cluster.node(0).store.insert_pool_entry(entry("fresh")).unwrap();

        let outcome = cluster
            .node(0)
            .coordinator
            .propagate_undelivered_pool()
            .await
            .unwrap();
        assert_eq!(outcome.to_string(), "NG:could not propagate to any peer");
        assert_eq!(cluster.node(0).store.undelivered_pool().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_to_propagate() {
        let cluster = TestCluster::new(2);
        let outcome = cluster
            .node(0)
            .coordinator
            .propagate_undelivered_pool()
            .await
            .unwrap();
        assert_eq!(outcome.to_string(), "OK:no undelivered entries");
    }

    #[tokio::test]
    async fn test_resolve_forks_without_fork() {
        let cluster = TestCluster::new(3);
        cluster.node(0).store.insert_block(genesis()).unwrap();
        let outcome = cluster.node(0).coordinator.resolve_forks().await.unwrap();
        assert_eq!(outcome.to_string(), "OK:no fork");
    }

    #[tokio::test]
    async fn test_operations_are_serialized_by_the_ledger_lock() {
        let cluster = TestCluster::new(2);
        let guard = cluster.node(0).ledger.lock().await;
        let coordinator = Arc::clone(&cluster.node(0).coordinator);
        let pending = tokio::spawn(async move { coordinator.resolve_forks().await });

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());
        drop(guard);
        assert!(pending.await.unwrap().unwrap().is_ok());
    }
}
