//! # Fork Resolver
//!
//! Repeatedly finds the fork nearest the tip, walks both branches and
//! deletes the shorter one from its root to its tip. Each deletion is
//! first broadcast to the peers; the local copy goes only after at least
//! one peer confirms. Entries carried by a deleted block return to the
//! pool as delivered unless they still exist elsewhere.

use std::sync::Arc;

use ledger_telemetry::{
    log_block_event, metric_inc, BLOCKS_PRUNED, ENTRIES_REQUEUED,
};
use shared_types::{Entry, Lookup, PeerInfo, RpcMethod, RpcRequest};

use crate::algorithms::{collect_tail, find_fork_point, has_fork, short_branch};
use crate::application::fanout::broadcast;
use crate::domain::{ForkReport, PrunedBlock, SyncError};
use crate::ports::{LedgerReader, LedgerStore, PeerTransport};

/// Return `entries` to the pool as delivered, skipping any whose id is
/// still in the chain or already pooled. Returns how many were inserted.
pub fn requeue_orphaned_entries(
    store: &dyn LedgerStore,
    entries: &[Entry],
) -> Result<usize, SyncError> {
    let mut requeued = 0;
    for entry in entries {
        if let Lookup::NotFound = store.find_entry(&entry.id)? {
            store.insert_pool_entry(entry.clone().into_delivered())?;
            requeued += 1;
        }
    }
    Ok(requeued)
}

/// Prunes forks, cluster-wide.
pub struct ForkResolver {
    transport: Arc<dyn PeerTransport>,
    peers: Vec<PeerInfo>,
}

impl ForkResolver {
    /// Resolver deleting through `peers`.
    pub fn new(transport: Arc<dyn PeerTransport>, peers: Vec<PeerInfo>) -> Self {
        Self { transport, peers }
    }

    /// True if any block in `reader` has two or more children.
    pub fn has_fork(&self, reader: &dyn LedgerReader) -> Result<bool, SyncError> {
        Ok(has_fork(&reader.blocks()?))
    }

    /// Prune until no fork remains or a deletion goes unconfirmed.
    /// The caller must hold the ledger lock.
    pub async fn resolve_all(&self, store: &dyn LedgerStore) -> Result<ForkReport, SyncError> {
        let mut report = ForkReport::default();

        while let Some(point) = find_fork_point(&store.blocks()?) {
            let bound = store.block_count()?;
            let child_of = |hash: &str| store.block_by_prev_hash(hash);

            let short = short_branch(&point, bound, child_of)?;
            let doomed = collect_tail(point.root(short).clone(), bound, child_of)?;
            tracing::info!(
                parent = %point.parent,
                branch = ?short,
                blocks = doomed.len(),
                "[ql-03] pruning short branch"
            );

            for block in doomed {
                let request = RpcRequest::with_hash(RpcMethod::ReceiveDeleteBlock, block.hash.clone());
                let acks = broadcast(&self.transport, &self.peers, &request)
                    .await
                    .iter()
                    .filter(|reply| reply.is_ack())
                    .count();
                if acks == 0 {
                    log_block_event!(warn, "ql-03", "no peer confirmed deletion", block.hash);
                    report.failure = Some(format!("no peer could delete {}", block.hash));
                    return Ok(report);
                }

                store.remove_block(&block.hash)?;
                let requeued = requeue_orphaned_entries(store, &block.data)?;
                metric_inc!(BLOCKS_PRUNED);
                ENTRIES_REQUEUED.inc_by(requeued as u64);
                log_block_event!(info, "ql-03", "block pruned", block.hash, acks, requeued);

                report.pruned.push(PrunedBlock {
                    hash: block.hash,
                    prev_hash: block.prev_hash,
                    entries: block.data.len(),
                    requeued,
                });
            }
        }

        Ok(report)
    }
}
