//! # Outbound Ports
//!
//! Storage and transport ports come from their own subsystems; the clock
//! is local to sync.

pub use ql_01_ledger_store::{LedgerReader, LedgerStore};
pub use ql_02_peer_transport::PeerTransport;

/// Source of block creation metadata.
pub trait Clock: Send + Sync {
    /// `YYYYMMDDHHMMSS` in local time.
    fn settime(&self) -> String;

    /// Unix epoch milliseconds as a decimal string.
    fn timestamp(&self) -> String;
}
