//! # Inbound Ports
//!
//! `LedgerReader` is safe to call at any time. `LedgerStore` adds the
//! write operations, which callers must serialize behind one lock.

use serde_json::Value;
use shared_types::{Block, Entry, Lookup};
use std::collections::HashSet;

use crate::domain::{query, StoreError};

/// Read access to chain and pool.
pub trait LedgerReader: Send + Sync {
    /// All blocks in insertion order.
    fn blocks(&self) -> Result<Vec<Block>, StoreError>;

    /// Block with this hash.
    fn block_by_hash(&self, hash: &str) -> Result<Lookup<Block>, StoreError>;

    /// First-inserted block whose `prev_hash` is `prev_hash`.
    fn block_by_prev_hash(&self, prev_hash: &str) -> Result<Lookup<Block>, StoreError>;

    /// All pool entries.
    fn pool_entries(&self) -> Result<Vec<Entry>, StoreError>;

    /// Pool entry with this id.
    fn pool_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError>;

    /// Committed entry with this id, from any block.
    fn entry_in_chain(&self, id: &str) -> Result<Lookup<Entry>, StoreError>;

    /// Number of blocks.
    fn block_count(&self) -> Result<usize, StoreError> {
        Ok(self.blocks()?.len())
    }

    /// Block hashes in insertion order.
    fn hash_list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.blocks()?.into_iter().map(|b| b.hash).collect())
    }

    /// Entry with this id in the chain, else in the pool.
    fn find_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        self.entry_in_chain(id)?.or_try_else(|| self.pool_entry(id))
    }

    /// Ids of every pool entry.
    fn pool_ids(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.pool_entries()?.into_iter().map(|e| e.id).collect())
    }

    /// Pool entries already propagated to peers.
    fn delivered_pool(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .pool_entries()?
            .into_iter()
            .filter(|e| e.delivered)
            .collect())
    }

    /// Pool entries not yet propagated.
    fn undelivered_pool(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self
            .pool_entries()?
            .into_iter()
            .filter(|e| !e.delivered)
            .collect())
    }

    /// Ids superseded by a `modify`/`delete` entry in chain or pool.
    fn superseded_ids(&self) -> Result<HashSet<String>, StoreError> {
        Ok(query::superseded_ids(&self.blocks()?, &self.pool_entries()?))
    }

    /// Live `new`/`modify` entries whose field at dotted `path` equals `value`.
    fn find_entries(&self, path: &str, value: &Value) -> Result<Vec<Entry>, StoreError> {
        Ok(query::find_entries(
            &self.blocks()?,
            &self.pool_entries()?,
            path,
            value,
        ))
    }
}

/// Write access to chain and pool.
pub trait LedgerStore: LedgerReader {
    /// This store as its read-only port.
    fn as_reader(&self) -> &dyn LedgerReader;

    /// Append a block. Fails on a duplicate hash.
    fn insert_block(&self, block: Block) -> Result<(), StoreError>;

    /// Replace the block stored under `hash` in place, keeping its position.
    fn replace_block(&self, hash: &str, block: Block) -> Result<(), StoreError>;

    /// Delete the block stored under `hash`.
    fn remove_block(&self, hash: &str) -> Result<Lookup<Block>, StoreError>;

    /// Add a pool entry. Fails on a duplicate id.
    fn insert_pool_entry(&self, entry: Entry) -> Result<(), StoreError>;

    /// Delete the pool entry with this id.
    fn remove_pool_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError>;

    /// Delete every delivered pool entry; returns how many were removed.
    fn remove_delivered_pool_entries(&self) -> Result<usize, StoreError>;

    /// Set the delivery flag on the listed entries; returns how many changed.
    fn mark_delivered(&self, ids: &[String]) -> Result<usize, StoreError>;
}
