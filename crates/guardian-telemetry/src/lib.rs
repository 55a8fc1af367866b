//! # Guardian Telemetry
//!
//! Structured logging and Prometheus metrics for the guard engine.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use guardian_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(&TelemetryConfig::from_env()).expect("telemetry");
//!     // engine calls now log through `tracing` and count through Prometheus
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `guardian` | Service name in log output |
//! | `GUARDIAN_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `GUARDIAN_CONSOLE_OUTPUT` | `true` | Write logs to stdout |
//! | `GUARDIAN_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, BATCH_ABORTS, FORWARDER_FAILURES, META_TX_REJECTED,
    NONCES_CONSUMED, TRANSACTIONS_FINALIZED, TRANSACTIONS_REQUESTED,
};
pub use tracing_setup::{init_test_tracing, init_tracing};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Register metrics and install the global tracing subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_tracing(config)
}

/// Increment a counter, optionally selecting label values.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
