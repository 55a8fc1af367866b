//! Prometheus metrics for the guard engine.
//!
//! All metrics follow the naming convention: `guardian_<area>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Encoder, Opts, Registry, TextEncoder};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Transactions created, by authorization path
    pub static ref TRANSACTIONS_REQUESTED: CounterVec = CounterVec::new(
        Opts::new("guardian_transactions_requested_total", "Guarded transactions created"),
        &["path"]  // path: time_delay/meta
    ).expect("metric creation failed");

    /// Transactions reaching a terminal status
    pub static ref TRANSACTIONS_FINALIZED: CounterVec = CounterVec::new(
        Opts::new("guardian_transactions_finalized_total", "Guarded transactions by terminal status"),
        &["status"]  // status: completed/failed/cancelled
    ).expect("metric creation failed");

    /// Meta-transactions rejected before their nonce was consumed
    pub static ref META_TX_REJECTED: CounterVec = CounterVec::new(
        Opts::new("guardian_meta_tx_rejected_total", "Rejected meta-transactions by error category"),
        &["category"]
    ).expect("metric creation failed");

    /// Nonces consumed by verified meta-transactions
    pub static ref NONCES_CONSUMED: Counter = Counter::new(
        "guardian_meta_tx_nonces_consumed_total",
        "Signer nonces consumed by verified meta-transactions"
    ).expect("metric creation failed");

    /// Configuration batches rolled back
    pub static ref BATCH_ABORTS: Counter = Counter::new(
        "guardian_batch_aborts_total",
        "Configuration batches aborted with no effects"
    ).expect("metric creation failed");

    /// Event forwarders that failed or panicked
    pub static ref FORWARDER_FAILURES: Counter = Counter::new(
        "guardian_forwarder_failures_total",
        "Event forwarder invocations that failed"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry. Repeat calls are no-ops.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TRANSACTIONS_REQUESTED.clone()),
        Box::new(TRANSACTIONS_FINALIZED.clone()),
        Box::new(META_TX_REJECTED.clone()),
        Box::new(NONCES_CONSUMED.clone()),
        Box::new(BATCH_ABORTS.clone()),
        Box::new(FORWARDER_FAILURES.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
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
