//! Domain types for the RPC gateway.

pub mod config;
pub mod error;

pub use config::{ConfigError, GatewayConfig, DEFAULT_MAX_BODY_BYTES};
pub use error::{codes, ApiError, GatewayError};
