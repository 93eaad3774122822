//! # Ports Layer
//!
//! The API other subsystems consume to read and write the ledger.

pub mod inbound;

pub use inbound::{LedgerReader, LedgerStore};
