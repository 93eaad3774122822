//! # QL-02 Peer Transport
//!
//! Delivers one request to one peer and returns its JSON result.
//!
//! **Subsystem ID:** 02
//! **Architecture:** Hexagonal (Ports/Adapters)
//!
//! ## Contract
//!
//! - One call, one attempt. No retries, no caching.
//! - Every failure (timeout, refused connection, non-2xx status, malformed
//!   body, JSON-RPC `error` member) is a [`TransportError`]. Callers decide
//!   whether a failure matters.
//! - A successful call may still carry an application-level failure marker
//!   such as `"NG"`; interpreting it is the caller's job.
//!
//! ## Adapters
//!
//! | Adapter | Use |
//! |---------|-----|
//! | [`HttpPeerTransport`] | `POST /checknode` with bearer credentials |
//! | [`MockPeerTransport`] | scripted replies for unit tests |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::{HttpPeerTransport, MockPeerTransport, Responder};
pub use config::TransportConfig;
pub use domain::TransportError;
pub use ports::PeerTransport;
