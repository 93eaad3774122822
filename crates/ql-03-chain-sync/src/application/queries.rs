//! # Read-only RPCs
//!
//! Answers for the methods that never touch the write lock. The resolver
//! uses the same code to give this node's own vote.

use serde_json::{json, Value};
use shared_types::{
    replies, ChainSnapshot, HashList, HashParams, Lookup, PoolSnapshot, RpcMethod, RpcRequest,
};

use crate::domain::SyncError;
use crate::ports::LedgerReader;

/// Answer a read-only request from `reader`.
pub fn answer(reader: &dyn LedgerReader, request: &RpcRequest) -> Result<Value, SyncError> {
    let method = request.method;
    match method {
        RpcMethod::CopyBlock => Ok(serde_json::to_value(ChainSnapshot {
            block: reader.blocks()?,
        })?),
        RpcMethod::CopyPool => Ok(serde_json::to_value(PoolSnapshot {
            pool: reader.delivered_pool()?,
        })?),
        RpcMethod::CheckBlockByHash => {
            let params: HashParams = hash_params(request)?;
            match reader.block_by_hash(&params.hash)? {
                Lookup::Found(block) => Ok(serde_json::to_value(block)?),
                Lookup::NotFound => Ok(json!(replies::BLOCK_NOT_FOUND)),
            }
        }
        RpcMethod::CheckBlockByPrevHash => {
            let params: HashParams = hash_params(request)?;
            match reader.block_by_prev_hash(&params.hash)? {
                Lookup::Found(block) => Ok(serde_json::to_value(block)?),
                Lookup::NotFound => Ok(json!(replies::NG)),
            }
        }
        RpcMethod::GetBlockCount => Ok(json!(reader.block_count()?)),
        RpcMethod::GetHashList => Ok(serde_json::to_value(HashList {
            hash: reader.hash_list()?,
        })?),
        RpcMethod::ReceivePool
        | RpcMethod::ReceiveBlock
        | RpcMethod::ReceiveSendBlock
        | RpcMethod::ReceiveDeleteBlock => Err(SyncError::invalid_params(
            method,
            "method writes to the ledger",
        )),
    }
}

fn hash_params(request: &RpcRequest) -> Result<HashParams, SyncError> {
    request
        .params_as()
        .map_err(|e| SyncError::invalid_params(request.method, e))
}
