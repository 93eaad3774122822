//! # Adapters Layer
//!
//! Concrete `LedgerStore` implementations.
//!
//! - `memory`: lock-protected in-memory snapshot (tests, ephemeral nodes)
//! - `file`: in-memory snapshot mirrored to a JSON file after each write
//! - `lock`: exclusive flock on the data directory

pub mod file;
pub mod lock;
pub mod memory;

pub use file::FileLedgerStore;
pub use lock::{DataDirLock, LockError};
pub use memory::MemoryLedgerStore;
