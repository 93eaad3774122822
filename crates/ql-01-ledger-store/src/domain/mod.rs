//! # Domain Layer
//!
//! Store errors, the in-memory snapshot representation and the lookup
//! rules shared by every adapter.

pub mod errors;
pub mod query;
pub mod snapshot;

pub use errors::StoreError;
pub use snapshot::LedgerSnapshot;
