//! # JSON File Store
//!
//! Keeps the ledger in a [`MemoryLedgerStore`] and rewrites
//! `<data_dir>/ledger.json` after every successful mutation. Writes go to
//! a temp file that is fsynced and renamed over the snapshot, so a crash
//! leaves either the old or the new snapshot on disk.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use shared_types::{Block, Entry, Lookup};

use super::{DataDirLock, MemoryLedgerStore};
use crate::domain::{LedgerSnapshot, StoreError};
use crate::ports::{LedgerReader, LedgerStore};

/// File-backed ledger store owning its data directory.
#[derive(Debug)]
pub struct FileLedgerStore {
    memory: MemoryLedgerStore,
    path: PathBuf,
    persist: Mutex<()>,
    _lock: DataDirLock,
}

impl FileLedgerStore {
    /// Snapshot file name inside the data directory.
    pub const SNAPSHOT_FILE: &'static str = "ledger.json";

    /// Open (or create) the ledger in `data_dir`, taking its exclusive lock.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let data_dir = data_dir.as_ref();
        std::fs::create_dir_all(data_dir)?;
        let lock = DataDirLock::acquire(data_dir)?;
        let path = data_dir.join(Self::SNAPSHOT_FILE);

        let snapshot = if path.exists() {
            let snapshot: LedgerSnapshot =
                serde_json::from_reader(BufReader::new(File::open(&path)?))?;
            tracing::info!(
                "[ql-01] 💾 Loaded {} blocks and {} pool entries from {}",
                snapshot.chain.len(),
                snapshot.pool.len(),
                path.display()
            );
            snapshot
        } else {
            tracing::info!("[ql-01] 📁 No ledger at {}, starting empty", path.display());
            LedgerSnapshot::new()
        };

        Ok(Self {
            memory: MemoryLedgerStore::from_snapshot(snapshot),
            path,
            persist: Mutex::new(()),
            _lock: lock,
        })
    }

    /// Path of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let _persist = self.persist.lock();
        let snapshot = self.memory.snapshot();
        let bytes = serde_json::to_vec(&snapshot)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;

        tracing::trace!(
            "[ql-01] 💾 Saved {} blocks, {} pool entries ({} bytes)",
            snapshot.chain.len(),
            snapshot.pool.len(),
            bytes.len()
        );
        Ok(())
    }

    fn persisted<T>(&self, result: Result<T, StoreError>) -> Result<T, StoreError> {
        let value = result?;
        self.save()?;
        Ok(value)
    }
}

impl LedgerReader for FileLedgerStore {
    fn blocks(&self) -> Result<Vec<Block>, StoreError> {
        self.memory.blocks()
    }

    fn block_by_hash(&self, hash: &str) -> Result<Lookup<Block>, StoreError> {
        self.memory.block_by_hash(hash)
    }

    fn block_by_prev_hash(&self, prev_hash: &str) -> Result<Lookup<Block>, StoreError> {
        self.memory.block_by_prev_hash(prev_hash)
    }

    fn pool_entries(&self) -> Result<Vec<Entry>, StoreError> {
        self.memory.pool_entries()
    }

    fn pool_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        self.memory.pool_entry(id)
    }

    fn entry_in_chain(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        self.memory.entry_in_chain(id)
    }

    fn block_count(&self) -> Result<usize, StoreError> {
        self.memory.block_count()
    }
}

impl LedgerStore for FileLedgerStore {
    fn as_reader(&self) -> &dyn LedgerReader {
        self
    }

    fn insert_block(&self, block: Block) -> Result<(), StoreError> {
        self.persisted(self.memory.insert_block(block))
    }

    fn replace_block(&self, hash: &str, block: Block) -> Result<(), StoreError> {
        self.persisted(self.memory.replace_block(hash, block))
    }

    fn remove_block(&self, hash: &str) -> Result<Lookup<Block>, StoreError> {
        let removed = self.memory.remove_block(hash)?;
        if removed.is_found() {
            self.save()?;
        }
        Ok(removed)
    }

    fn insert_pool_entry(&self, entry: Entry) -> Result<(), StoreError> {
        self.persisted(self.memory.insert_pool_entry(entry))
    }

    fn remove_pool_entry(&self, id: &str) -> Result<Lookup<Entry>, StoreError> {
        let removed = self.memory.remove_pool_entry(id)?;
        if removed.is_found() {
            self.save()?;
        }
        Ok(removed)
    }

    fn remove_delivered_pool_entries(&self) -> Result<usize, StoreError> {
        let removed = self.memory.remove_delivered_pool_entries()?;
        if removed > 0 {
            self.save()?;
        }
        Ok(removed)
    }

    fn mark_delivered(&self, ids: &[String]) -> Result<usize, StoreError> {
        let changed = self.memory.mark_delivered(ids)?;
        if changed > 0 {
            self.save()?;
        }
        Ok(changed)
    }
}
