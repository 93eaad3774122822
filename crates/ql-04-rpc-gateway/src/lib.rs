//! # RPC Gateway (Subsystem 04)
//!
//! HTTP surface of a ledger node.
//!
//! ## Routes
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `POST /checknode` | Peer JSON-RPC 2.0 (single or batch) |
//! | `POST /sync/gen` | Create genesis |
//! | `POST /sync/poolsync` | Pull a pool snapshot |
//! | `POST /sync/blockdiff` | Block sync by majority |
//! | `POST /sync/blocksync` | Full resync (audit, blocks, forks) |
//! | `POST /sync/resolvefork` | Resolve forks |
//! | `POST /sync/audit` | Tamper audit and repair |
//! | `POST /delivery/deliverypool` | Propagate undelivered entries |
//! | `GET /health` | Liveness probe (no auth) |
//! | `GET /metrics` | Prometheus text (no auth) |
//!
//! Operator routes answer `200` with the `OK:`/`NG:` outcome text; a fatal
//! error answers `500 {"message":"invalid"}`.
//!
//! ## Security
//!
//! - Shared token via `Authorization: Bearer` or `X-API-Key`, compared in
//!   constant time
//! - Request body size cap

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
pub mod middleware;
pub mod service;

pub use domain::{ApiError, ConfigError, GatewayConfig, GatewayError, DEFAULT_MAX_BODY_BYTES};
pub use middleware::{AuthConfig, AuthLayer};
pub use service::RpcGateway;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
