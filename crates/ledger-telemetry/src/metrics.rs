//! Prometheus metrics for Quorum-Ledger nodes.
//!
//! All metrics follow the naming convention: `lq_<area>_<metric>_total`

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // SYNC METRICS (ql-03)
    // =========================================================================

    /// Sync operations by operation and result
    pub static ref SYNC_OPERATIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("lq_sync_operations_total", "Sync operations executed"),
        &["operation", "result"]  // result: ok/ng/error
    ).expect("metric creation failed");

    /// Tampered blocks replaced with the majority version
    pub static ref BLOCKS_REPAIRED: IntCounter = IntCounter::new(
        "lq_audit_blocks_repaired_total",
        "Tampered blocks replaced with the majority version"
    ).expect("metric creation failed");

    /// Tampered blocks that could not be repaired
    pub static ref BLOCKS_UNREPAIRABLE: IntCounter = IntCounter::new(
        "lq_audit_blocks_unrepairable_total",
        "Tampered blocks left in place because no majority version was usable"
    ).expect("metric creation failed");

    /// Blocks deleted while resolving forks
    pub static ref BLOCKS_PRUNED: IntCounter = IntCounter::new(
        "lq_fork_blocks_pruned_total",
        "Blocks deleted from short fork branches"
    ).expect("metric creation failed");

    /// Orphaned entries returned to the pool
    pub static ref ENTRIES_REQUEUED: IntCounter = IntCounter::new(
        "lq_pool_entries_requeued_total",
        "Entries returned to the pool after their block was deleted"
    ).expect("metric creation failed");

    /// Blocks accepted from peers
    pub static ref BLOCKS_RECEIVED: IntCounter = IntCounter::new(
        "lq_chain_blocks_received_total",
        "Blocks accepted from peers"
    ).expect("metric creation failed");

    // =========================================================================
    // PEER RPC METRICS (ql-02, ql-04)
    // =========================================================================

    /// Failed outbound peer calls by method
    pub static ref PEER_CALL_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("lq_peer_call_failures_total", "Outbound peer calls that failed"),
        &["method"]
    ).expect("metric creation failed");

    /// Inbound peer RPC requests by method
    pub static ref RPC_REQUESTS_SERVED: IntCounterVec = IntCounterVec::new(
        Opts::new("lq_rpc_requests_served_total", "Inbound peer RPC requests served"),
        &["method"]
    ).expect("metric creation failed");
}

/// Handle to the registered metrics.
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the global registry.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(SYNC_OPERATIONS.clone()),
        Box::new(BLOCKS_REPAIRED.clone()),
        Box::new(BLOCKS_UNREPAIRABLE.clone()),
        Box::new(BLOCKS_PRUNED.clone()),
        Box::new(ENTRIES_REQUEUED.clone()),
        Box::new(BLOCKS_RECEIVED.clone()),
        Box::new(PEER_CALL_FAILURES.clone()),
        Box::new(RPC_REQUESTS_SERVED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_encode_contains_registered_counter() {
        register_metrics().unwrap();
        BLOCKS_REPAIRED.inc();
        let text = encode_metrics().unwrap();
        assert!(text.contains("lq_audit_blocks_repaired_total"));
    }

    #[test]
    fn test_labelled_counter() {
        PEER_CALL_FAILURES.with_label_values(&["copyBlock"]).inc();
        assert!(PEER_CALL_FAILURES.with_label_values(&["copyBlock"]).get() >= 1);
    }
}
