//! # Adapters Layer

pub mod http;
pub mod mock;

pub use http::HttpPeerTransport;
pub use mock::{MockPeerTransport, Responder};
