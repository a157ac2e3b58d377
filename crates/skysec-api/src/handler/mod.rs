//! HTTP handler infrastructure for the command API
//!
//! - `routes`: router construction, endpoint handlers and [`ApiError`]
//! - `extract`: JSON body extractor with [`ApiError`] rejections
//!
//! All handlers share one [`AppState`] behind an `Arc`. The health aggregator
//! sits behind an async mutex so toggles and snapshots are serialized.

pub mod extract;
pub mod routes;

pub use extract::ApiJson;
pub use routes::{create_router, ApiError, CONTROL_SECRET_HEADER};

use std::path::PathBuf;
use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use skysec_audit::{AuditLevel, AuditSink};
use skysec_core::health::{HealthAggregator, ProcSampler, ServiceStatus};
use skysec_core::{Mission, MissionStore, SkysecConfig};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::salesforce::{SalesforceClient, SalesforceError};
use crate::telemetry::{ApiMetrics, TelemetryError};

/// Shared handler state
pub struct AppState {
    pub aggregator: Mutex<HealthAggregator>,
    pub missions: Arc<dyn MissionStore>,
    pub audit: Arc<AuditSink>,
    pub metrics: ApiMetrics,
    control_secret: SecretString,
    /// Complexity used for risk enrichment until asset data carries one
    pub default_complexity: i64,
    /// Dashboard directory served at `/` and `/static`
    pub static_dir: Option<PathBuf>,
}

/// Errors assembling the application state
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Control secret is not configured")]
    MissingControlSecret,

    #[error("Salesforce client error: {0}")]
    Salesforce(#[from] SalesforceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl AppState {
    pub fn new(
        aggregator: HealthAggregator,
        missions: Arc<dyn MissionStore>,
        audit: AuditSink,
        control_secret: SecretString,
    ) -> Result<Self, StartupError> {
        Ok(Self {
            aggregator: Mutex::new(aggregator),
            missions,
            audit: Arc::new(audit),
            metrics: ApiMetrics::new()?,
            control_secret,
            default_complexity: 3,
            static_dir: None,
        })
    }

    /// Wire the production state from a validated configuration
    pub fn from_config(config: &SkysecConfig) -> Result<Self, StartupError> {
        let secret = config
            .security
            .control_secret
            .clone()
            .ok_or(StartupError::MissingControlSecret)?;

        let aggregator = HealthAggregator::new(&config.health, Box::new(ProcSampler::new()));
        let missions: Arc<dyn MissionStore> =
            Arc::new(SalesforceClient::new(config.salesforce.clone())?);
        let audit = AuditSink::new(&config.audit.log_file);

        let mut state = Self::new(aggregator, missions, audit, secret)?;
        state.default_complexity = config.missions.default_complexity;
        state.static_dir = config.server.static_dir.clone();
        Ok(state)
    }

    pub fn with_default_complexity(mut self, complexity: i64) -> Self {
        self.default_complexity = complexity;
        self
    }

    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    pub(crate) fn control_secret(&self) -> &SecretString {
        &self.control_secret
    }

    /// Write one audit record and count the outcome.
    ///
    /// The sink does blocking file I/O, so the write runs on the blocking pool.
    pub async fn audit(&self, level: AuditLevel, action: &str, subject: &str, details: &str) {
        let sink = Arc::clone(&self.audit);
        let record = (action.to_string(), subject.to_string(), details.to_string());

        let written = tokio::task::spawn_blocking(move || {
            let (action, subject, details) = record;
            match level {
                AuditLevel::Info => sink.log(&action, &subject, &details),
                AuditLevel::Warn => sink.warn(&action, &subject, &details),
            }
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!(target: "audit", error = %e, action = %action, "Audit task failed");
            false
        });

        self.metrics.record_audit(action, written);
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("missions", &self.missions.name())
            .field("audit", &self.audit.path())
            .field("default_complexity", &self.default_complexity)
            .field("static_dir", &self.static_dir)
            .finish_non_exhaustive()
    }
}

/// Liveness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Body of `POST /api/system/control`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlRequest {
    pub service_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub new_state: ServiceStatus,
}

/// Query for `GET /api/missions`
#[derive(Debug, Default, Deserialize)]
pub struct MissionQuery {
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionListResponse {
    pub count: usize,
    pub missions: Vec<Mission>,
}

/// Body of `PATCH /api/missions/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateResponse {
    pub status: String,
    pub mission_id: String,
    pub new_status: String,
}

/// Error body returned by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorInfo,
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorInfo {
                code: code.into(),
                message: message.into(),
            },
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
