//! Telemetry for the command API
//!
//! Structured logs go through `tracing`; counters and gauges live in a
//! Prometheus registry owned by [`ApiMetrics`] and are exposed on `/metrics`.

pub mod metrics;

pub use metrics::ApiMetrics;

use thiserror::Error;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    #[error("Metrics encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
