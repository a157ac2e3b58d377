//! Prometheus metrics for the command API
//!
//! - `skysec_readiness_level` (gauge) - 0 READY, 1 DEGRADED, 2 NOT_READY
//! - `skysec_audit_records_total` (counter) - audit records written, by action
//! - `skysec_audit_write_failures_total` (counter) - records that never reached the log
//! - `skysec_control_rejections_total` (counter) - control requests with a bad secret
//! - `skysec_missions_served_total` (counter) - missions returned by the list endpoint

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use skysec_core::Readiness;

use super::{Result, TelemetryError};

const NAMESPACE: &str = "skysec";

/// Metrics owned by the API process
pub struct ApiMetrics {
    registry: Registry,
    readiness_level: IntGauge,
    audit_records_total: IntCounterVec,
    audit_write_failures_total: IntCounter,
    control_rejections_total: IntCounter,
    missions_served_total: IntCounter,
}

impl ApiMetrics {
    /// Create the metric set in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let readiness_level = IntGauge::with_opts(
            Opts::new(
                "readiness_level",
                "Aggregate readiness from the last snapshot (0 READY, 1 DEGRADED, 2 NOT_READY)",
            )
            .namespace(NAMESPACE),
        )?;

        let audit_records_total = IntCounterVec::new(
            Opts::new("audit_records_total", "Audit records written by action")
                .namespace(NAMESPACE),
            &["action"],
        )?;

        let audit_write_failures_total = IntCounter::with_opts(
            Opts::new(
                "audit_write_failures_total",
                "Audit records that could not be written",
            )
            .namespace(NAMESPACE),
        )?;

        let control_rejections_total = IntCounter::with_opts(
            Opts::new(
                "control_rejections_total",
                "Service control requests rejected for a bad secret",
            )
            .namespace(NAMESPACE),
        )?;

        let missions_served_total = IntCounter::with_opts(
            Opts::new(
                "missions_served_total",
                "Missions returned by the mission list endpoint",
            )
            .namespace(NAMESPACE),
        )?;

        registry.register(Box::new(readiness_level.clone()))?;
        registry.register(Box::new(audit_records_total.clone()))?;
        registry.register(Box::new(audit_write_failures_total.clone()))?;
        registry.register(Box::new(control_rejections_total.clone()))?;
        registry.register(Box::new(missions_served_total.clone()))?;

        Ok(Self {
            registry,
            readiness_level,
            audit_records_total,
            audit_write_failures_total,
            control_rejections_total,
            missions_served_total,
        })
    }

    pub fn set_readiness(&self, readiness: Readiness) {
        self.readiness_level.set(i64::from(readiness.severity()));
    }

    /// Record the outcome of one audit write
    pub fn record_audit(&self, action: &str, written: bool) {
        if written {
            self.audit_records_total.with_label_values(&[action]).inc();
        } else {
            self.audit_write_failures_total.inc();
        }
    }

    pub fn record_control_rejection(&self) {
        self.control_rejections_total.inc();
    }

    pub fn record_missions_served(&self, count: usize) {
        self.missions_served_total.inc_by(count as u64);
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encoding(e.to_string()))
    }
}

impl std::fmt::Debug for ApiMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiMetrics")
            .field("readiness_level", &self.readiness_level.get())
            .finish_non_exhaustive()
    }
}
