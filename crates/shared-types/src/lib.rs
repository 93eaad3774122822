//! # Shared Types Crate
//!
//! Domain entities and wire types shared by every Quorum-Ledger subsystem.
//!
//! ## Contents
//!
//! - **Entities**: `Block`, `Entry`, `EntryKind`, `PeerInfo`
//! - **Hashing**: canonical block serialization and SHA-256 content hash
//! - **Lookup**: `Lookup<T>`, the found/not-found sum type used by every
//!   store query instead of nullable results
//! - **RPC**: the peer method set, JSON-RPC envelopes and reply markers

pub mod entities;
pub mod errors;
pub mod lookup;
pub mod rpc;

pub use entities::*;
pub use errors::*;
pub use lookup::Lookup;
pub use rpc::*;
