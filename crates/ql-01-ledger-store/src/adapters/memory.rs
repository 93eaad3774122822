//! In-memory ledger store.

use parking_lot::RwLock;
use shared_types::{Block, Entry, Lookup};

use crate::domain::{LedgerSnapshot, StoreError};
use crate::ports::{LedgerReader, LedgerStore};

/// Ledger held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: RwLock<LedgerSnapshot>,
}

impl MemoryLedgerStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-loaded with `snapshot`.
    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.read().clone()
    }
}

impl LedgerReader for MemoryLedgerStore {
    fn blocks(&self) -> Result<Vec<Block>, StoreError> {
        Ok(self.inner.read().chain.clone())
    }

    fn block_by_hash(&self, hash: &str) -> Result<Lookup<Block>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.chain.iter().find(|b| b.hash == hash).cloned().into())
    }

    fn block_by_prev_hash(&self, prev_hash: &str) -> Result<Lookup<Block>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .chain
            .iter()
            .find(|b| b.prev_hash == prev_hash)
            .cloned()
            .into())
    }

    fn pool_entries(&self) -> Result<Vec<Entry>, StoreError> {
        Ok(self.inner.read().pool.clone())
    }

    fn pool_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.pool.iter().find(|e| e.id == id).cloned().into())
    }

    fn entry_in_chain(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .chain
            .iter()
            .flat_map(|b| b.data.iter())
            .find(|e| e.id == id)
            .cloned()
            .into())
    }

    fn block_count(&self) -> Result<usize, StoreError> {
        Ok(self.inner.read().chain.len())
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn as_reader(&self) -> &dyn LedgerReader {
        self
    }

    fn insert_block(&self, block: Block) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.block_index(&block.hash).is_some() {
            return Err(StoreError::DuplicateBlock { hash: block.hash });
        }
        inner.chain.push(block);
        Ok(())
    }

    fn replace_block(&self, hash: &str, block: Block) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        let index = inner
            .block_index(hash)
            .ok_or_else(|| StoreError::BlockNotFound {
                hash: hash.to_string(),
            })?;
        inner.chain[index] = block;
        Ok(())
    }

    fn remove_block(&self, hash: &str) -> Result<Lookup<Block>, StoreError> {
        let mut inner = self.inner.write();
        Ok(inner
            .block_index(hash)
            .map(|index| inner.chain.remove(index))
            .into())
    }

    fn insert_pool_entry(&self, entry: Entry) -> Result<(), StoreError> {
        let mut inner = self.inner.write();
        if inner.pool_index(&entry.id).is_some() {
            return Err(StoreError::DuplicateEntry { id: entry.id });
        }
        inner.pool.push(entry);
        Ok(())
    }

    fn remove_pool_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        let mut inner = self.inner.write();
        Ok(inner
            .pool_index(id)
            .map(|index| inner.pool.remove(index))
            .into())
    }

    fn remove_delivered_pool_entries(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.pool.len();
        inner.pool.retain(|e| !e.delivered);
        Ok(before - inner.pool.len())
    }

    fn mark_delivered(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut inner = self.inner.write();
        let mut changed = 0;
        for entry in inner.pool.iter_mut() {
            if !entry.delivered && ids.contains(&entry.id) {
                entry.delivered = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
