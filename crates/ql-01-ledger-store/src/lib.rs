//! # QL-01 Ledger Store
//!
//! Persistence for the two ledger collections: the **chain** (blocks, in
//! insertion order) and the **pool** (uncommitted entries).
//!
//! **Subsystem ID:** 01
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Ports
//!
//! | Port | Access | Purpose |
//! |------|--------|---------|
//! | `LedgerReader` | shared | chain/pool queries, superseded-aware key lookup |
//! | `LedgerStore` | exclusive | inserts, replacements, deletions |
//!
//! Callers are expected to serialize every `LedgerStore` write behind a
//! single process-wide lock; the adapters themselves are only internally
//! consistent per call.
//!
//! ## Module Structure
//!
//! ```text
//! ql-01-ledger-store/
//! ├── domain/      # StoreError, LedgerSnapshot, lookup rules
//! ├── ports/       # LedgerReader / LedgerStore traits
//! └── adapters/    # In-memory store, JSON-file store, data-dir lock
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::{DataDirLock, FileLedgerStore, LockError, MemoryLedgerStore};
pub use domain::{LedgerSnapshot, StoreError};
pub use ports::{LedgerReader, LedgerStore};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
