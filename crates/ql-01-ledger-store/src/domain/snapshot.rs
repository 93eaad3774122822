//! # Ledger Snapshot
//!
//! Both collections as one serializable value. The memory adapter keeps
//! one of these behind a lock; the file adapter writes it to disk.

use serde::{Deserialize, Serialize};
use shared_types::{Block, Entry};

/// Full contents of a ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Blocks in insertion order.
    pub chain: Vec<Block>,
    /// Pool entries.
    pub pool: Vec<Entry>,
}

impl LedgerSnapshot {
    /// Empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger with the given chain and an empty pool.
    pub fn with_chain(chain: Vec<Block>) -> Self {
        Self {
            chain,
            pool: Vec::new(),
        }
    }

    pub(crate) fn block_index(&self, hash: &str) -> Option<usize> {
        self.chain.iter().position(|b| b.hash == hash)
    }

    pub(crate) fn pool_index(&self, id: &str) -> Option<usize> {
        self.pool.iter().position(|e| e.id == id)
    }
}
