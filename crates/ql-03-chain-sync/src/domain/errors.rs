//! # Domain Errors
//!
//! Only fatal failures are errors here. Quorum loss, missing majorities,
//! unrepairable blocks and failed deletions are reported as values.

use ql_01_ledger_store::StoreError;
use shared_types::TypesError;
use thiserror::Error;

/// Fatal chain sync errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Ledger store failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// A block or request could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Hashing or wire vocabulary error.
    #[error("Type error: {0}")]
    Types(#[from] TypesError),

    /// Request params did not have the expected shape.
    #[error("Invalid params for {method}: {reason}")]
    InvalidParams {
        /// Method being served
        method: String,
        /// What was wrong
        reason: String,
    },
}

impl SyncError {
    /// Params error for `method`.
    pub fn invalid_params(method: impl ToString, reason: impl ToString) -> Self {
        Self::InvalidParams {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }
}
