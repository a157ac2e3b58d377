//! Route definitions for the command API
//!
//! - GET /health - liveness
//! - GET /api/system/status - health snapshot
//! - POST /api/system/control - toggle a simulated service (shared secret)
//! - GET /api/missions - missions with risk enrichment
//! - PATCH /api/missions/:mission_id - update a mission's readiness status
//! - GET /metrics - Prometheus exposition
//! - GET / and /static/* - dashboard files, when a static directory is set

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use constant_time_eq::constant_time_eq;
use secrecy::ExposeSecret;
use skysec_audit::AuditLevel;
use skysec_core::{HealthError, HealthSnapshot, SERVICE_NAME, SERVICE_VERSION};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use super::{
    ApiJson, AppState, ControlRequest, ControlResponse, ErrorResponse, HealthResponse,
    MissionListResponse, MissionQuery, StatusUpdate, StatusUpdateResponse,
};

/// Header carrying the control shared secret
pub const CONTROL_SECRET_HEADER: &str = "x-control-secret";

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Body missing, not JSON, or not the expected shape
    InvalidBody { status: StatusCode, message: String },
    Forbidden(String),
    NotFound(String),
    InternalError(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidBody { .. } => "INVALID_BODY",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody { status, .. } => *status,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::InvalidBody { message, .. } => message,
            ApiError::Forbidden(msg) | ApiError::NotFound(msg) | ApiError::InternalError(msg) => {
                msg
            }
        }
    }
}

impl From<HealthError> for ApiError {
    fn from(err: HealthError) -> Self {
        match err {
            HealthError::ServiceNotFound(name) => {
                ApiError::NotFound(format!("Service '{}' not found", name))
            }
            HealthError::Sampling(msg) => {
                ApiError::InternalError(format!("Host sampling failed: {}", msg))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.error_code(), self.message());
        (self.status_code(), Json(body)).into_response()
    }
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let static_dir = state.static_dir.clone();

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/api/system/status", get(system_status))
        .route("/api/system/control", post(system_control))
        .route("/api/missions", get(list_missions))
        .route("/api/missions/:mission_id", patch(update_mission))
        .route("/metrics", get(metrics));

    let router = match static_dir {
        Some(dir) => router
            .route_service("/", ServeFile::new(dir.join("index.html")))
            .nest_service("/static", ServeDir::new(dir)),
        None => router,
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// GET /health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVICE_NAME.to_string(),
        version: SERVICE_VERSION.to_string(),
    })
}

/// GET /api/system/status
pub async fn system_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthSnapshot>, ApiError> {
    let snapshot = state.aggregator.lock().await.snapshot()?;
    state.metrics.set_readiness(snapshot.readiness);
    Ok(Json(snapshot))
}

/// POST /api/system/control
///
/// The secret is checked before the service name, so an unauthorized caller
/// cannot learn which services exist.
pub async fn system_control(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<ControlRequest>,
) -> Result<Json<ControlResponse>, ApiError> {
    let provided = headers
        .get(CONTROL_SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    let expected = state.control_secret().expose_secret().as_bytes();

    if provided.is_empty() || !constant_time_eq(provided, expected) {
        state.metrics.record_control_rejection();
        state
            .audit(
                AuditLevel::Warn,
                "UNAUTHORIZED_CONTROL",
                &request.service_name,
                "Invalid control secret",
            )
            .await;
        tracing::warn!(service = %request.service_name, "Rejected service control request");
        return Err(ApiError::Forbidden("Invalid control secret".to_string()));
    }

    let new_state = state
        .aggregator
        .lock()
        .await
        .toggle_service(&request.service_name, request.active)?;

    state
        .audit(
            AuditLevel::Info,
            "SERVICE_TOGGLE",
            &request.service_name,
            &format!("New state: {}", new_state.as_str()),
        )
        .await;

    Ok(Json(ControlResponse {
        success: true,
        new_state,
    }))
}

/// GET /api/missions
pub async fn list_missions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MissionQuery>,
) -> Json<MissionListResponse> {
    let region = query.region.filter(|r| !r.is_empty());
    tracing::info!(
        region = region.as_deref().unwrap_or("All"),
        "Fetching missions"
    );

    let mut missions = state.missions.active_missions().await;
    if let Some(region) = &region {
        missions.retain(|m| m.in_region(region));
    }

    for mission in &mut missions {
        let assessment = mission.enrich(state.default_complexity);
        state
            .audit(
                AuditLevel::Info,
                "RISK_CALCULATION",
                &mission.id,
                &format!(
                    "Score: {} | Level: {}",
                    assessment.score, assessment.risk_level
                ),
            )
            .await;
    }

    state.metrics.record_missions_served(missions.len());
    Json(MissionListResponse {
        count: missions.len(),
        missions,
    })
}

/// PATCH /api/missions/:mission_id
pub async fn update_mission(
    State(state): State<Arc<AppState>>,
    Path(mission_id): Path<String>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<Json<StatusUpdateResponse>, ApiError> {
    match state
        .missions
        .update_mission_status(&mission_id, &update.status)
        .await
    {
        Ok(()) => {
            state
                .audit(
                    AuditLevel::Info,
                    "UPDATE_SUCCESS",
                    &mission_id,
                    &format!("New status: {}", update.status),
                )
                .await;
            Ok(Json(StatusUpdateResponse {
                status: "success".to_string(),
                mission_id,
                new_status: update.status,
            }))
        }
        Err(e) => {
            state
                .audit(
                    AuditLevel::Info,
                    "UPDATE_FAILED",
                    &mission_id,
                    &format!("Attempted status: {}", update.status),
                )
                .await;
            tracing::error!(mission_id = %mission_id, error = %e, "Mission update failed");
            Err(ApiError::InternalError(
                "Failed to update Salesforce record".to_string(),
            ))
        }
    }
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let body = state
        .metrics
        .render()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_responses() {
        let error = ApiError::Forbidden("nope".to_string());
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(error.error_code(), "FORBIDDEN");

        let error: ApiError = HealthError::ServiceNotFound("Radar".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert!(error.message().contains("Radar"));

        let error: ApiError = HealthError::sampling("no /proc").into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let error = ApiError::InvalidBody {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "missing field `status`".to_string(),
        };
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(error.error_code(), "INVALID_BODY");
    }
}
