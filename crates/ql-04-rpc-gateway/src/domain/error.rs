//! Gateway error types with JSON-RPC 2.0 error codes.

use serde::Serialize;
use std::fmt;

use ql_03_chain_sync::SyncError;
use shared_types::JsonRpcError;

/// Standard JSON-RPC 2.0 error codes
pub mod codes {
    /// Body is not JSON.
    pub const PARSE_ERROR: i64 = -32700;
    /// JSON, but not a request envelope.
    pub const INVALID_REQUEST: i64 = -32600;
    /// Method outside the peer method set.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Params of the wrong shape.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Storage or encoding failure while serving.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Missing or wrong credentials.
    pub const UNAUTHORIZED: i64 = -32010;
}

/// Gateway error with JSON-RPC code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    /// JSON-RPC error code
    pub code: i64,
    /// Error message
    pub message: String,
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Parse error - invalid JSON
    pub fn parse_error(details: impl fmt::Display) -> Self {
        Self::new(codes::PARSE_ERROR, format!("Parse error: {details}"))
    }

    /// Invalid request - not a valid JSON-RPC request
    pub fn invalid_request(details: impl fmt::Display) -> Self {
        Self::new(codes::INVALID_REQUEST, format!("Invalid request: {details}"))
    }

    /// Method not found
    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    /// Invalid parameters
    pub fn invalid_params(details: impl fmt::Display) -> Self {
        Self::new(codes::INVALID_PARAMS, format!("Invalid params: {details}"))
    }

    /// Internal error
    pub fn internal(details: impl fmt::Display) -> Self {
        Self::new(codes::INTERNAL_ERROR, format!("Internal error: {details}"))
    }

    /// Unauthorized - missing or invalid credentials
    pub fn unauthorized(details: impl fmt::Display) -> Self {
        Self::new(codes::UNAUTHORIZED, format!("Unauthorized: {details}"))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::InvalidParams { .. } => ApiError::invalid_params(err),
            other => ApiError::internal(other),
        }
    }
}

impl From<ApiError> for JsonRpcError {
    fn from(err: ApiError) -> Self {
        JsonRpcError {
            code: err.code,
            message: err.message,
        }
    }
}

/// Gateway-level errors (not JSON-RPC, internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Server stopped with an I/O error
    #[error("server error: {0}")]
    Server(String),
}
