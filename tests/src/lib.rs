//! # Quorum-Ledger Test Suite
//!
//! Multi-node flows that cross crate boundaries.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── cluster_flows.rs   # In-process clusters over the loopback network
//!     └── http_flows.rs      # Real gateways and HTTP transport on ephemeral ports
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ql-tests
//! cargo test -p ql-tests integration::http_flows
//! ```

pub mod integration;
