//! # Error Types
//!
//! Errors raised while building or parsing shared types.

use thiserror::Error;

/// Errors from shared type construction.
#[derive(Debug, Error)]
pub enum TypesError {
    /// A peer address was not of the form `host:port`.
    #[error("Invalid peer address: {0}")]
    InvalidPeerAddress(String),

    /// An RPC method name is not part of the peer method set.
    #[error("Unknown RPC method: {0}")]
    UnknownMethod(String),

    /// Canonical serialization failed while hashing.
    #[error("Hashing failed: {0}")]
    Hashing(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_peer_address_error() {
        let err = TypesError::InvalidPeerAddress("nohost".to_string());
        assert!(err.to_string().contains("nohost"));
    }

    #[test]
    fn test_unknown_method_error() {
        let err = TypesError::UnknownMethod("mineBlock".to_string());
        assert!(err.to_string().contains("mineBlock"));
    }
}
