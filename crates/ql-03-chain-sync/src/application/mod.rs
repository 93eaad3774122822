//! # Application Layer
//!
//! The four engine components plus the plumbing they share.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`SharedLedger`] | store plus the process-wide write lock |
//! | [`MajorityResolver`] | fan a probe out, name the majority participant |
//! | [`TamperAuditor`] | verify block hashes, repair from the majority |
//! | [`ForkResolver`] | prune the shorter branch of every fork |
//! | [`SyncCoordinator`] | pool/chain reconciliation, sequencing, locking |
//! | [`PeerRpcService`] | the peer RPC methods this node serves |

pub mod auditor;
pub mod coordinator;
pub mod fanout;
pub mod fork_resolver;
pub mod ledger;
pub mod queries;
pub mod receiver;
pub mod resolver;

pub use auditor::TamperAuditor;
pub use coordinator::SyncCoordinator;
pub use fanout::{broadcast, call_peer, PeerReply};
pub use fork_resolver::{requeue_orphaned_entries, ForkResolver};
pub use ledger::{LedgerGuard, SharedLedger};
pub use receiver::PeerRpcService;
pub use resolver::MajorityResolver;
