//! Middleware stack for the RPC gateway.
//!
//! Layer order: Request → Trace → BodyLimit → Auth → Handler

pub mod auth;

pub use auth::{constant_time_compare, AuthConfig, AuthLayer, RequireToken, EXEMPT_PATHS};
