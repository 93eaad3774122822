//! # Transport Errors

use thiserror::Error;

/// Why a single peer call failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connect or read timeout elapsed.
    #[error("Timeout calling {peer}")]
    Timeout {
        /// Peer address
        peer: String,
    },

    /// TCP connection could not be established.
    #[error("Connection to {peer} failed: {reason}")]
    Connect {
        /// Peer address
        peer: String,
        /// Underlying cause
        reason: String,
    },

    /// Peer answered with a non-success HTTP status.
    #[error("Peer {peer} returned HTTP {status}")]
    Status {
        /// Peer address
        peer: String,
        /// HTTP status code
        status: u16,
    },

    /// Body was not a JSON-RPC response with a result.
    #[error("Invalid response from {peer}: {reason}")]
    InvalidResponse {
        /// Peer address
        peer: String,
        /// What was wrong
        reason: String,
    },

    /// Peer returned a JSON-RPC error object.
    #[error("Peer {peer} RPC error {code}: {message}")]
    Rpc {
        /// Peer address
        peer: String,
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Peer could not be reached for any other reason.
    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable {
        /// Peer address
        peer: String,
        /// Underlying cause
        reason: String,
    },

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Address of the peer involved, if any.
    pub fn peer(&self) -> Option<&str> {
        match self {
            Self::Timeout { peer }
            | Self::Connect { peer, .. }
            | Self::Status { peer, .. }
            | Self::InvalidResponse { peer, .. }
            | Self::Rpc { peer, .. }
            | Self::Unreachable { peer, .. } => Some(peer),
            Self::Client(_) => None,
        }
    }
}
