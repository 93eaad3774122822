//! Transport configuration.

use std::time::Duration;

/// Per-call limits and credentials for outbound peer calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Time allowed to establish the TCP connection.
    pub connect_timeout: Duration,
    /// Time allowed for the whole request, response body included.
    pub read_timeout: Duration,
    /// Shared secret presented as `Authorization: Bearer <token>`.
    pub auth_token: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_millis(10_000),
            read_timeout: Duration::from_millis(100_000),
            auth_token: None,
        }
    }
}

impl TransportConfig {
    /// Short timeouts so unreachable peers fail fast in tests.
    pub fn for_testing() -> Self {
        Self {
            connect_timeout: Duration::from_millis(500),
            read_timeout: Duration::from_secs(2),
            auth_token: None,
        }
    }

    /// Builder: set the shared secret.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}
