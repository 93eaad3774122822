//! # Domain Errors
//!
//! Error types for the Ledger Store.

use thiserror::Error;

use crate::adapters::LockError;

/// Ledger store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A block with this hash is already stored.
    #[error("Duplicate block: {hash}")]
    DuplicateBlock {
        /// Hash of the rejected block
        hash: String,
    },

    /// No block with this hash exists.
    #[error("Block not found: {hash}")]
    BlockNotFound {
        /// Requested hash
        hash: String,
    },

    /// An entry with this id is already in the pool.
    #[error("Duplicate pool entry: {id}")]
    DuplicateEntry {
        /// Id of the rejected entry
        id: String,
    },

    /// Reading or writing the snapshot file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot file could not be encoded or decoded.
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The data directory is locked by another process.
    #[error("Data directory lock error: {0}")]
    Lock(#[from] LockError),
}
