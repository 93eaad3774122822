//! Telemetry settings read from `LQ_*` environment variables.

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Name attached to the startup record
    pub service_name: String,

    /// `EnvFilter` directive, e.g. `info` or `ql_03_chain_sync=debug`
    pub log_level: String,

    /// Render records as JSON lines
    pub json_logs: bool,

    /// Include thread ids in records
    pub thread_ids: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "quorum-ledger".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            thread_ids: true,
        }
    }
}

impl TelemetryConfig {
    /// Read `LQ_SERVICE_NAME`, `LQ_LOG_LEVEL` (falling back to `RUST_LOG`)
    /// and `LQ_JSON_LOGS` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: lookup("LQ_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("LQ_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("LQ_JSON_LOGS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.json_logs),
            thread_ids: defaults.thread_ids,
        }
    }

    /// Quiet configuration for tests.
    pub fn for_testing() -> Self {
        Self {
            log_level: "warn".to_string(),
            thread_ids: false,
            ..Self::default()
        }
    }
}
