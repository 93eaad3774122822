//! # QL-03 Chain Sync
//!
//! Consensus, fork resolution, tamper audit and pool/chain reconciliation
//! for a permissioned ledger node.
//!
//! **Subsystem ID:** 03
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Nodes hold a full copy of the chain and a pool of pending entries.
//! There is no proof-of-work: when copies diverge, the node trusts the
//! majority of its statically configured peers.
//!
//! | Component | Responsibility |
//! |-----------|----------------|
//! | Majority resolver | Fan a probe out, name the participant the most others agree with |
//! | Tamper auditor | Recompute block hashes, repair tampered blocks from the majority |
//! | Fork resolver | Prune the shorter branch of every fork, requeue its entries |
//! | Sync coordinator | Pool copy, chain diff, propagation, genesis, under one lock |
//! | Peer RPC service | The method set peers call on this node |
//!
//! ## Failure Model
//!
//! Losing quorum, ties, unrepairable blocks and unconfirmed deletions are
//! reported as `NG:` outcomes. Only storage and encoding failures surface
//! as [`SyncError`].
//!
//! ## Module Structure
//!
//! ```text
//! ql-03-chain-sync/
//! ├── domain/          # Participants, probes, reports, errors, invariants
//! ├── algorithms/      # Majority selection, fork point and branch walks
//! ├── ports/           # SyncApi, PeerRpcApi (inbound); store, transport, clock (outbound)
//! ├── application/     # The engine components and the shared ledger lock
//! ├── adapters/        # System clock
//! └── config.rs        # SyncConfig
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-exports
pub use adapters::SystemClock;
pub use algorithms::{find_fork_point, has_fork, select_majority, Branch, ForkPoint};
pub use application::{
    ForkResolver, LedgerGuard, MajorityResolver, PeerRpcService, SharedLedger, SyncCoordinator,
    TamperAuditor,
};
pub use config::SyncConfig;
pub use domain::{
    AuditOutcome, AuditReport, BlockAudit, BlockDiffReport, ForkReport, Majority,
    MajorityWarning, Participant, PoolSyncReport, Probe, PrunedBlock, Resolution, SyncError,
    SyncOutcome,
};
pub use ports::{Clock, PeerRpcApi, SyncApi};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
