//! # Shared Ledger
//!
//! One store, one write lock. Reads go straight to the store; the write
//! port is only reachable through a [`LedgerGuard`], so every mutation,
//! whether from a sync pass or from a peer message, is serialized.

use std::ops::Deref;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::ports::{LedgerReader, LedgerStore};

/// The ledger and its global write lock.
pub struct SharedLedger {
    store: Arc<dyn LedgerStore>,
    write_lock: Mutex<()>,
}

impl SharedLedger {
    /// Wrap `store`.
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// Lock-free read access.
    pub fn reader(&self) -> &dyn LedgerReader {
        self.store.as_reader()
    }

    /// Wait for the write lock.
    pub async fn lock(&self) -> LedgerGuard<'_> {
        LedgerGuard {
            _held: self.write_lock.lock().await,
            store: Arc::clone(&self.store),
        }
    }

    /// Take the write lock only if it is free.
    pub fn try_lock(&self) -> Option<LedgerGuard<'_>> {
        self.write_lock.try_lock().ok().map(|held| LedgerGuard {
            _held: held,
            store: Arc::clone(&self.store),
        })
    }
}

impl std::fmt::Debug for SharedLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLedger")
            .field("locked", &self.write_lock.try_lock().is_err())
            .finish()
    }
}

/// Write access to the ledger, held until dropped.
pub struct LedgerGuard<'a> {
    _held: MutexGuard<'a, ()>,
    store: Arc<dyn LedgerStore>,
}

impl Deref for LedgerGuard<'_> {
    type Target = dyn LedgerStore;

    fn deref(&self) -> &Self::Target {
        self.store.as_ref()
    }
}
