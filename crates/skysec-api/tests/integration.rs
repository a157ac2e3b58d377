//! Integration tests for the command API router

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::SecretString;
use serde_json::{json, Value};
use skysec_api::handler::{create_router, AppState, CONTROL_SECRET_HEADER};
use skysec_audit::AuditSink;
use skysec_core::config::HealthConfig;
use skysec_core::health::{FixedSampler, HealthAggregator, HostSampler, ScriptedSampler};
use skysec_core::{Mission, MissionStore, MissionStoreError};
use tower::ServiceExt;

const SECRET: &str = "launch-authority";

/// In-memory mission store
#[derive(Default)]
struct FakeStore {
    missions: Vec<Mission>,
    reject_updates: bool,
}

#[async_trait]
impl MissionStore for FakeStore {
    fn name(&self) -> &str {
        "fake"
    }

    async fn active_missions(&self) -> Vec<Mission> {
        self.missions.clone()
    }

    async fn update_mission_status(
        &self,
        mission_id: &str,
        _status: &str,
    ) -> Result<(), MissionStoreError> {
        if self.reject_updates || !self.missions.iter().any(|m| m.id == mission_id) {
            return Err(MissionStoreError::Rejected {
                status: 404,
                message: "ENTITY_IS_DELETED".to_string(),
            });
        }
        Ok(())
    }
}

fn mission(id: &str, region: &str, status: &str) -> Mission {
    Mission {
        id: id.to_string(),
        mission_name: format!("Mission {}", id),
        region: region.to_string(),
        status: status.to_string(),
        asset: "Falcon-7".to_string(),
        risk_assessment: None,
    }
}

fn fleet() -> FakeStore {
    FakeStore {
        missions: vec![
            mission("a01", "EMEA", "NOT_READY"),
            mission("a02", "APAC", "READY"),
            mission("a03", "emea", "DEGRADED"),
        ],
        ..FakeStore::default()
    }
}

struct Harness {
    _dir: tempfile::TempDir,
    audit_log: PathBuf,
    state: Arc<AppState>,
}

impl Harness {
    fn new(store: FakeStore, sampler: impl HostSampler + 'static) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let audit_log = dir.path().join("audit.log");
        let aggregator = HealthAggregator::new(&HealthConfig::default(), Box::new(sampler));
        let state = AppState::new(
            aggregator,
            Arc::new(store),
            AuditSink::new(&audit_log),
            SecretString::new(SECRET.to_string()),
        )
        .unwrap();

        Self {
            _dir: dir,
            audit_log,
            state: Arc::new(state),
        }
    }

    fn idle(store: FakeStore) -> Self {
        Self::new(store, FixedSampler::new(12.5, 40.0))
    }

    fn router(&self) -> Router {
        create_router(Arc::clone(&self.state))
    }

    fn audit_lines(&self) -> Vec<String> {
        read_lines(&self.audit_log)
    }
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value, secret: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(secret) = secret {
        builder = builder.header(CONTROL_SECRET_HEADER, secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn control(service: &str, active: bool, secret: Option<&str>) -> Request<Body> {
    json_request(
        "POST",
        "/api/system/control",
        json!({ "service_name": service, "active": active }),
        secret,
    )
}

#[tokio::test]
async fn test_health_endpoint() {
    let harness = Harness::idle(FakeStore::default());
    let (status, body) = send(harness.router(), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "skysec-unified-command");
}

#[tokio::test]
async fn test_status_snapshot_shape() {
    let harness = Harness::idle(FakeStore::default());
    let (status, body) = send(harness.router(), get("/api/system/status")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mode"], "SIMULATION");
    assert_eq!(body["readiness"], "READY");
    assert_eq!(body["cpu_usage"], 12.5);
    assert_eq!(body["services"]["MCx Core"]["status"], "ONLINE");
    assert_eq!(body["services"]["Video Gateway"]["critical"], false);
    // the first snapshot replaces the startup record
    assert_eq!(body["last_transition"]["from"], "READY");
    assert_eq!(body["last_transition"]["cause"], "All Systems Nominal");
    assert_eq!(body["readiness_reasons"], json!([]));
}

#[tokio::test]
async fn test_status_sampling_failure_is_500() {
    let harness = Harness::new(FakeStore::default(), ScriptedSampler::default());
    let (status, body) = send(harness.router(), get("/api/system/status")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn test_sustained_cpu_load_degrades_readiness() {
    let harness = Harness::new(
        FakeStore::default(),
        ScriptedSampler::new([(95.0, 40.0), (96.0, 40.0), (97.0, 40.0)]),
    );

    let mut body = Value::Null;
    for _ in 0..3 {
        body = send(harness.router(), get("/api/system/status")).await.1;
    }

    assert_eq!(body["readiness"], "DEGRADED");
    let reasons = body["readiness_reasons"].to_string();
    assert!(reasons.contains("CPU Critical"));
    assert_eq!(body["last_transition"]["from"], "READY");
    assert_eq!(body["last_transition"]["cause"], "CPU Critical (97%)");
}

#[tokio::test]
async fn test_control_with_bad_secret_is_rejected_and_audited() {
    let harness = Harness::idle(FakeStore::default());

    let (status, body) = send(harness.router(), control("MCx Core", false, Some("guess"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = send(harness.router(), control("MCx Core", false, None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let lines = harness.audit_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines
        .iter()
        .all(|l| l.contains("| WARN | UNAUTHORIZED_CONTROL | MCx Core |")));

    // registry untouched
    let (_, body) = send(harness.router(), get("/api/system/status")).await;
    assert_eq!(body["services"]["MCx Core"]["status"], "ONLINE");
    assert_eq!(body["readiness"], "READY");
}

#[tokio::test]
async fn test_control_unknown_service_is_404_without_audit() {
    let harness = Harness::idle(FakeStore::default());

    let (status, body) = send(harness.router(), control("Nonexistent", true, Some(SECRET))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(harness.audit_lines().is_empty());
}

#[tokio::test]
async fn test_control_toggle_applies_on_next_snapshot() {
    let harness = Harness::idle(FakeStore::default());

    let (status, body) = send(harness.router(), control("MCx Core", false, Some(SECRET))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "new_state": "OFFLINE" }));

    let (_, body) = send(harness.router(), get("/api/system/status")).await;
    assert_eq!(body["readiness"], "NOT_READY");
    assert_eq!(body["readiness_reasons"][0], "MCx Core unavailable");
    assert_eq!(body["last_transition"]["to"], "NOT_READY");

    let lines = harness.audit_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("| INFO | SERVICE_TOGGLE | MCx Core | New state: OFFLINE"));

    let (_, body) = send(harness.router(), control("MCx Core", true, Some(SECRET))).await;
    assert_eq!(body["new_state"], "ONLINE");
    let (_, body) = send(harness.router(), get("/api/system/status")).await;
    assert_eq!(body["readiness"], "READY");
    assert_eq!(body["last_transition"]["cause"], "All Systems Nominal");
}

#[tokio::test]
async fn test_missions_are_filtered_and_enriched() {
    let harness = Harness::idle(fleet());

    let (status, body) = send(harness.router(), get("/api/missions?region=Emea")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let missions = body["missions"].as_array().unwrap();
    assert_eq!(missions[0]["id"], "a01");
    assert_eq!(missions[0]["risk_assessment"]["score"], 81.0);
    assert_eq!(missions[0]["risk_assessment"]["risk_level"], "CRITICAL");
    assert_eq!(missions[1]["id"], "a03");
    assert_eq!(missions[1]["risk_assessment"]["score"], 53.0);
    assert_eq!(missions[1]["risk_assessment"]["risk_level"], "ELEVATED");

    let lines = harness.audit_lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("| INFO | RISK_CALCULATION | a01 | Score: 81 | Level: CRITICAL"));
    assert!(lines[1].contains("| RISK_CALCULATION | a03 |"));
}

#[tokio::test]
async fn test_missions_without_region_returns_all() {
    let harness = Harness::idle(fleet());

    let (_, body) = send(harness.router(), get("/api/missions")).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["missions"][1]["risk_assessment"]["risk_level"], "LOW");
    assert_eq!(harness.audit_lines().len(), 3);
}

#[tokio::test]
async fn test_custom_complexity_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let aggregator = HealthAggregator::new(
        &HealthConfig::default(),
        Box::new(FixedSampler::new(10.0, 10.0)),
    );
    let state = AppState::new(
        aggregator,
        Arc::new(fleet()),
        AuditSink::new(dir.path().join("audit.log")),
        SecretString::new(SECRET.to_string()),
    )
    .unwrap()
    .with_default_complexity(5);

    let (_, body) = send(create_router(Arc::new(state)), get("/api/missions?region=APAC")).await;
    assert_eq!(body["missions"][0]["risk_assessment"]["score"], 37.0);
}

#[tokio::test]
async fn test_empty_store_returns_empty_list_without_audit() {
    let harness = Harness::idle(FakeStore::default());

    let (status, body) = send(harness.router(), get("/api/missions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "count": 0, "missions": [] }));
    assert!(harness.audit_lines().is_empty());
}

#[tokio::test]
async fn test_update_success_is_audited_once() {
    let harness = Harness::idle(fleet());

    let (status, body) = send(
        harness.router(),
        json_request("PATCH", "/api/missions/a02", json!({ "status": "DEGRADED" }), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "success", "mission_id": "a02", "new_status": "DEGRADED" })
    );

    let lines = harness.audit_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("| INFO | UPDATE_SUCCESS | a02 | New status: DEGRADED"));
}

#[tokio::test]
async fn test_update_failure_is_500_and_audited_once() {
    let harness = Harness::idle(FakeStore {
        reject_updates: true,
        ..fleet()
    });

    let (status, body) = send(
        harness.router(),
        json_request("PATCH", "/api/missions/a09", json!({ "status": "READY" }), None),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Failed to update Salesforce record");

    let lines = harness.audit_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with("| INFO | UPDATE_FAILED | a09 | Attempted status: READY"));
}

#[tokio::test]
async fn test_metrics_reflect_activity() {
    let harness = Harness::idle(fleet());

    send(harness.router(), control("Secure Uplink", false, Some("wrong"))).await;
    send(harness.router(), get("/api/missions")).await;
    send(harness.router(), get("/api/system/status")).await;

    let response = harness.router().oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(text.contains("skysec_control_rejections_total 1"));
    assert!(text.contains("skysec_missions_served_total 3"));
    assert!(text.contains("skysec_audit_records_total{action=\"RISK_CALCULATION\"} 3"));
    assert!(text.contains("skysec_audit_records_total{action=\"UNAUTHORIZED_CONTROL\"} 1"));
    assert!(text.contains("skysec_readiness_level 0"));
}

#[tokio::test]
async fn test_audit_failure_does_not_fail_request() {
    let dir = tempfile::tempdir().unwrap();
    let aggregator = HealthAggregator::new(
        &HealthConfig::default(),
        Box::new(FixedSampler::new(10.0, 10.0)),
    );
    let state = AppState::new(
        aggregator,
        Arc::new(fleet()),
        AuditSink::new(dir.path().join("missing").join("audit.log")),
        SecretString::new(SECRET.to_string()),
    )
    .unwrap();
    let state = Arc::new(state);

    let (status, body) = send(create_router(Arc::clone(&state)), get("/api/missions")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    assert_eq!(state.audit.failure_count(), 3);
}

#[tokio::test]
async fn test_dashboard_is_served_from_static_dir() {
    let site = tempfile::tempdir().unwrap();
    std::fs::write(site.path().join("index.html"), "<h1>SkySec</h1>").unwrap();
    std::fs::write(site.path().join("app.js"), "console.log('ready');").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let aggregator = HealthAggregator::new(
        &HealthConfig::default(),
        Box::new(FixedSampler::new(10.0, 10.0)),
    );
    let state = AppState::new(
        aggregator,
        Arc::new(FakeStore::default()),
        AuditSink::new(dir.path().join("audit.log")),
        SecretString::new(SECRET.to_string()),
    )
    .unwrap()
    .with_static_dir(site.path());
    let router = create_router(Arc::new(state));

    let (status, body) = send(router.clone(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("<h1>SkySec</h1>".to_string()));

    let (status, _) = send(router, get("/static/app.js")).await;
    assert_eq!(status, StatusCode::OK);
}

fn raw_request(method: &str, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTROL_SECRET_HEADER, SECRET);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_malformed_bodies_use_error_shape() {
    let harness = Harness::idle(fleet());

    let (status, body) = send(
        harness.router(),
        raw_request("POST", "/api/system/control", Some("application/json"), "{not json"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "INVALID_BODY");
    assert!(body["request_id"].is_string());

    let (status, body) = send(
        harness.router(),
        raw_request(
            "PATCH",
            "/api/missions/a01",
            Some("application/json"),
            r#"{"state":"READY"}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "INVALID_BODY");

    let (status, body) = send(
        harness.router(),
        raw_request("PATCH", "/api/missions/a01", None, r#"{"status":"READY"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["success"], false);

    assert!(harness.audit_lines().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn test_concurrent_listings_audit_every_mission() {
    let harness = Harness::idle(fleet());

    let handles: Vec<_> = (0..4)
        .map(|_| tokio::spawn(send(harness.router(), get("/api/missions"))))
        .collect();
    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
    }

    let lines = harness.audit_lines();
    assert_eq!(lines.len(), 12);
    assert!(lines.iter().all(|l| l.contains("| RISK_CALCULATION |")));
}
