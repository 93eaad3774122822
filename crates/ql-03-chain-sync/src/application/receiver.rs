//! # Peer RPC Service
//!
//! The receiving side of the peer protocol. Read-only methods answer
//! straight from the store; the four `receive*` methods take the ledger
//! lock. `receiveSendBlock` lets go of the lock before relaying so the
//! relay cannot wait on a peer that is itself waiting on this node.

use std::sync::Arc;

use async_trait::async_trait;
use ledger_telemetry::{log_block_event, metric_inc, BLOCKS_RECEIVED, RPC_REQUESTS_SERVED};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared_types::{
    replies, Block, BlockParams, HashParams, Lookup, PeerInfo, PoolParams, RpcMethod, RpcRequest,
};

use crate::application::fanout::broadcast;
use crate::application::fork_resolver::requeue_orphaned_entries;
use crate::application::ledger::SharedLedger;
use crate::application::queries;
use crate::domain::SyncError;
use crate::ports::{LedgerStore, PeerRpcApi, PeerTransport};

/// Serves the peer RPC method set for one node.
pub struct PeerRpcService {
    ledger: Arc<SharedLedger>,
    transport: Arc<dyn PeerTransport>,
    peers: Vec<PeerInfo>,
}

impl PeerRpcService {
    /// Service over `ledger`, relaying to `peers`.
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

    async fn receive_pool(&self, request: &RpcRequest) -> Result<Value, SyncError> {
        let params: PoolParams = decode(request)?;
        let store = self.ledger.lock().await;
        let mut accepted = 0usize;
        for entry in params.list.data {
            if store.find_entry(&entry.id)?.is_found() {
                continue;
            }
            store.insert_pool_entry(entry.into_delivered())?;
            accepted += 1;
        }
        tracing::debug!(accepted, "[ql-03] pool entries received");
        Ok(json!(replies::OK))
    }

    async fn receive_block(&self, request: &RpcRequest) -> Result<Value, SyncError> {
        let BlockParams { block } = decode(request)?;
        let store = self.ledger.lock().await;
        Ok(reply(accept_block(&*store, block, true)?))
    }

    async fn receive_send_block(&self, request: &RpcRequest) -> Result<Value, SyncError> {
        let BlockParams { block } = decode(request)?;
        let accepted = {
            let store = self.ledger.lock().await;
            accept_block(&*store, block.clone(), false)?
        };
        if !accepted {
            return Ok(reply(false));
        }

        let relay = RpcRequest::with_block(RpcMethod::ReceiveBlock, &block)?;
        let replies = broadcast(&self.transport, &self.peers, &relay).await;
        let relayed = replies.iter().filter(|r| r.is_ack()).count();
        if relayed < replies.len() {
            log_block_event!(warn, "ql-03", "block relay incomplete", block.hash, relayed, peers = replies.len());
        }
        Ok(reply(relayed == replies.len()))
    }

    async fn receive_delete_block(&self, request: &RpcRequest) -> Result<Value, SyncError> {
        let HashParams { hash } = decode(request)?;
        let store = self.ledger.lock().await;
        match store.remove_block(&hash)? {
            Lookup::Found(block) => {
                let requeued = requeue_orphaned_entries(&*store, &block.data)?;
                log_block_event!(info, "ql-03", "block deleted on peer request", hash, requeued);
                Ok(reply(true))
            }
            Lookup::NotFound => Ok(reply(false)),
        }
    }
}

#[async_trait]
impl PeerRpcApi for PeerRpcService {
    async fn handle(&self, request: RpcRequest) -> Result<Value, SyncError> {
        metric_inc!(RPC_REQUESTS_SERVED, &[request.method.as_str()]);
        match request.method {
            RpcMethod::ReceivePool => self.receive_pool(&request).await,
            RpcMethod::ReceiveBlock => self.receive_block(&request).await,
            RpcMethod::ReceiveSendBlock => self.receive_send_block(&request).await,
            RpcMethod::ReceiveDeleteBlock => self.receive_delete_block(&request).await,
            _ => queries::answer(self.ledger.reader(), &request),
        }
    }
}

/// Insert `block` if its hash is new and its parent is present. Genesis
/// blocks have no parent and are taken only when `allow_genesis` is set.
/// Entries the block commits leave the pool.
pub fn accept_block(
    store: &dyn LedgerStore,
    block: Block,
    allow_genesis: bool,
) -> Result<bool, SyncError> {
    if store.block_by_hash(&block.hash)?.is_found() {
        log_block_event!(debug, "ql-03", "duplicate block rejected", block.hash);
        return Ok(false);
    }
    if block.is_genesis() {
        if !allow_genesis {
            return Ok(false);
        }
    } else if !store.block_by_hash(&block.prev_hash)?.is_found() {
        log_block_event!(debug, "ql-03", "orphan block rejected", block.hash, prev_hash = %block.prev_hash);
        return Ok(false);
    }

    let committed: Vec<String> = block.entry_ids().map(str::to_string).collect();
    let hash = block.hash.clone();
    store.insert_block(block)?;
    for id in &committed {
        store.remove_pool_entry(id)?;
    }
    metric_inc!(BLOCKS_RECEIVED);
    log_block_event!(info, "ql-03", "block accepted", hash, entries = committed.len());
    Ok(true)
}

fn reply(ok: bool) -> Value {
    json!(if ok { replies::OK } else { replies::NG })
}

fn decode<T: DeserializeOwned>(request: &RpcRequest) -> Result<T, SyncError> {
    request
        .params_as()
        .map_err(|e| SyncError::invalid_params(request.method, e))
}
