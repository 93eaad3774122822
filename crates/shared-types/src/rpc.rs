//! # Peer RPC Vocabulary
//!
//! The method set every node both calls and serves, their parameter and
//! result shapes, and the JSON-RPC 2.0 envelope carried over HTTP.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::entities::{Block, Entry};
use crate::errors::TypesError;

/// Reply markers exchanged as plain JSON strings.
pub mod replies {
    /// Request accepted.
    pub const OK: &str = "OK";
    /// Request rejected, or the call failed.
    pub const NG: &str = "NG";
    /// `checkBlockByHash` found no such block.
    pub const BLOCK_NOT_FOUND: &str = "BLOCK_NOT_FOUND";
}

/// True if `value` is the `"OK"` acknowledgement.
pub fn is_ok_reply(value: &Value) -> bool {
    value.as_str() == Some(replies::OK)
}

/// True if `value` is the `"NG"` failure marker.
pub fn is_failure_marker(value: &Value) -> bool {
    value.as_str() == Some(replies::NG)
}

/// Peer RPC methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcMethod {
    /// Full chain snapshot.
    #[serde(rename = "copyBlock")]
    CopyBlock,
    /// Delivered-pool snapshot.
    #[serde(rename = "copyPool")]
    CopyPool,
    /// Accept propagated pool entries.
    #[serde(rename = "receivePool")]
    ReceivePool,
    /// Accept a block.
    #[serde(rename = "receiveBlock")]
    ReceiveBlock,
    /// Accept a block and relay it to every peer.
    #[serde(rename = "receiveSendBlock")]
    ReceiveSendBlock,
    /// Delete a block by hash.
    #[serde(rename = "receiveDeleteBlock")]
    ReceiveDeleteBlock,
    /// Fetch a block by its hash.
    #[serde(rename = "checkBlockByHash")]
    CheckBlockByHash,
    /// Fetch the first child of a hash.
    #[serde(rename = "checkBlockByPrevHash")]
    CheckBlockByPrevHash,
    /// Number of blocks.
    #[serde(rename = "getBlockCount")]
    GetBlockCount,
    /// All block hashes in chain order.
    #[serde(rename = "getHashList")]
    GetHashList,
}

impl RpcMethod {
    /// Every method, in wire-table order.
    pub const ALL: [RpcMethod; 10] = [
        RpcMethod::CopyBlock,
        RpcMethod::CopyPool,
        RpcMethod::ReceivePool,
        RpcMethod::ReceiveBlock,
        RpcMethod::ReceiveSendBlock,
        RpcMethod::ReceiveDeleteBlock,
        RpcMethod::CheckBlockByHash,
        RpcMethod::CheckBlockByPrevHash,
        RpcMethod::GetBlockCount,
        RpcMethod::GetHashList,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            RpcMethod::CopyBlock => "copyBlock",
            RpcMethod::CopyPool => "copyPool",
            RpcMethod::ReceivePool => "receivePool",
            RpcMethod::ReceiveBlock => "receiveBlock",
            RpcMethod::ReceiveSendBlock => "receiveSendBlock",
            RpcMethod::ReceiveDeleteBlock => "receiveDeleteBlock",
            RpcMethod::CheckBlockByHash => "checkBlockByHash",
            RpcMethod::CheckBlockByPrevHash => "checkBlockByPrevHash",
            RpcMethod::GetBlockCount => "getBlockCount",
            RpcMethod::GetHashList => "getHashList",
        }
    }

    /// True for methods that write to the ledger and must take the global lock.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            RpcMethod::ReceivePool
                | RpcMethod::ReceiveBlock
                | RpcMethod::ReceiveSendBlock
                | RpcMethod::ReceiveDeleteBlock
        )
    }
}

impl fmt::Display for RpcMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RpcMethod {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RpcMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| TypesError::UnknownMethod(s.to_string()))
    }
}

// =============================================================================
// PARAMETER AND RESULT SHAPES
// =============================================================================

/// `{"hash": ...}`, used by delete and check methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashParams {
    /// Target hash.
    pub hash: String,
}

/// `{"block": ...}`, used by the receive methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockParams {
    /// The block.
    pub block: Block,
}

/// `{"list": {"data": [...]}}`, used by `receivePool`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolParams {
    /// Wrapped entry list.
    pub list: PoolList,
}

/// Inner entry list of [`PoolParams`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolList {
    /// Entries.
    pub data: Vec<Entry>,
}

/// `copyBlock` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Blocks in chain order.
    pub block: Vec<Block>,
}

/// `copyPool` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Delivered entries.
    pub pool: Vec<Entry>,
}

/// `getHashList` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HashList {
    /// Block hashes in chain order.
    pub hash: Vec<String>,
}

// =============================================================================
// REQUESTS
// =============================================================================

/// A typed peer request: method plus JSON params.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Method to invoke.
    pub method: RpcMethod,
    /// Method parameters; `null` when the method takes none.
    pub params: Value,
}

impl RpcRequest {
    /// A request with no parameters.
    pub fn new(method: RpcMethod) -> Self {
        Self {
            method,
            params: Value::Null,
        }
    }

    /// `{"hash": hash}` request for `method`.
    pub fn with_hash(method: RpcMethod, hash: impl Into<String>) -> Self {
        Self {
            method,
            params: json!({ "hash": hash.into() }),
        }
    }

    /// `receiveBlock`/`receiveSendBlock` request.
    pub fn with_block(method: RpcMethod, block: &Block) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method,
            params: json!({ "block": serde_json::to_value(block)? }),
        })
    }

    /// `receivePool` request.
    pub fn receive_pool(entries: &[Entry]) -> Result<Self, serde_json::Error> {
        Ok(Self {
            method: RpcMethod::ReceivePool,
            params: json!({ "list": { "data": serde_json::to_value(entries)? } }),
        })
    }

    /// Decode params into their typed shape.
    pub fn params_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.params.clone())
    }
}

// =============================================================================
// JSON-RPC 2.0 ENVELOPE
// =============================================================================

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";

/// JSON-RPC request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Parameters.
    #[serde(default)]
    pub params: Value,
}

impl JsonRpcRequest {
    /// Wrap a typed request.
    pub fn from_request(request: &RpcRequest, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: request.method.as_str().to_string(),
            params: request.params.clone(),
        }
    }

    /// Unwrap into a typed request.
    pub fn to_request(&self) -> Result<RpcRequest, TypesError> {
        Ok(RpcRequest {
            method: self.method.parse()?,
            params: self.params.clone(),
        })
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// JSON-RPC response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Correlation id.
    pub id: Value,
    /// Result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}
