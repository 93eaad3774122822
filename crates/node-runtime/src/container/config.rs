//! # Node Configuration
//!
//! Everything a node needs to start, read from `LQ_*` environment
//! variables with defaults.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `LQ_RPC_HOST` | `0.0.0.0` | Gateway bind host |
//! | `LQ_RPC_PORT` | `8080` | Gateway bind port |
//! | `LQ_PEERS` | empty | Comma-separated `host:port` peers, in diff order |
//! | `LQ_AUTH_TOKEN` | unset | Shared secret for inbound and outbound calls |
//! | `LQ_CONNECT_TIMEOUT_MS` | `10000` | Outbound connect timeout |
//! | `LQ_READ_TIMEOUT_MS` | `100000` | Outbound request timeout |
//! | `LQ_DATA_DIR` | unset | JSON file store directory (in-memory when unset) |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ql_02_peer_transport::TransportConfig;
use ql_04_rpc_gateway::GatewayConfig;
use shared_types::PeerInfo;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// HTTP surface.
    pub gateway: GatewayConfig,
    /// Statically configured peers.
    pub peers: Vec<PeerInfo>,
    /// Outbound call limits.
    pub connect_timeout: Duration,
    /// Outbound request timeout, body included.
    pub read_timeout: Duration,
    /// Shared secret (None = open cluster).
    pub auth_token: Option<String>,
    /// File store directory; in-memory store when None.
    pub data_dir: Option<PathBuf>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        let transport = TransportConfig::default();
        Self {
            gateway: GatewayConfig::default(),
            peers: Vec::new(),
            connect_timeout: transport.connect_timeout,
            read_timeout: transport.read_timeout,
            auth_token: None,
            data_dir: None,
        }
    }
}

impl NodeConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` for each variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("LQ_RPC_HOST") {
            config.gateway.host = host;
        }
        if let Some(port) = lookup("LQ_RPC_PORT") {
            config.gateway.port = parse_var("LQ_RPC_PORT", &port)?;
        }
        if let Some(peers) = lookup("LQ_PEERS") {
            config.peers = parse_peers(&peers)?;
        }
        if let Some(token) = lookup("LQ_AUTH_TOKEN") {
            config.auth_token = Some(token);
        }
        if let Some(ms) = lookup("LQ_CONNECT_TIMEOUT_MS") {
            config.connect_timeout = Duration::from_millis(parse_var("LQ_CONNECT_TIMEOUT_MS", &ms)?);
        }
        if let Some(ms) = lookup("LQ_READ_TIMEOUT_MS") {
            config.read_timeout = Duration::from_millis(parse_var("LQ_READ_TIMEOUT_MS", &ms)?);
        }
        if let Some(dir) = lookup("LQ_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }

        config.gateway.api_key = config.auth_token.clone();
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(&self.auth_token, Some(token) if token.is_empty()) {
            return Err(ConfigError::EmptyAuthToken);
        }
        self.gateway
            .validate()
            .map_err(|e| ConfigError::Gateway(e.to_string()))?;
        if self.connect_timeout.is_zero() || self.read_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        for (i, peer) in self.peers.iter().enumerate() {
            if self.peers[..i].contains(peer) {
                return Err(ConfigError::DuplicatePeer(peer.id()));
            }
        }
        Ok(())
    }

    /// Outbound transport settings.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
            auth_token: self.auth_token.clone(),
        }
    }

    /// Label this node uses for itself.
    pub fn local_label(&self) -> String {
        self.gateway.bind_addr()
    }
}

fn parse_var<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_peers(list: &str) -> Result<Vec<PeerInfo>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().map_err(|_| ConfigError::InvalidPeer(s.to_string())))
        .collect()
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("{name} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// A peer entry is not `host:port`.
    #[error("invalid peer address {0:?}, expected host:port")]
    InvalidPeer(String),

    /// A peer is listed twice.
    #[error("peer {0} listed more than once")]
    DuplicatePeer(String),

    /// A timeout of zero.
    #[error("timeouts must be greater than zero")]
    ZeroTimeout,

    /// Token set to the empty string.
    #[error("LQ_AUTH_TOKEN is empty; unset it to disable auth")]
    EmptyAuthToken,

    /// Gateway settings rejected.
    #[error("gateway: {0}")]
    Gateway(String),
}
