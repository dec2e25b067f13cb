mod common;

use alert_engine::alerts::{ChannelKind, EscalationRunner};
use alert_engine::api::{AlertAppState, app};
use axum::http::StatusCode;
use axum_test::TestServer;
use common::{Behaviour, dispatcher, harness, registry_with};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

fn test_server() -> TestServer {
    let (registry, _) = registry_with(&[
        (ChannelKind::Messaging, Behaviour::Succeed),
        (ChannelKind::Email, Behaviour::Succeed),
    ]);
    let h = harness(registry.clone());
    let escalations = Arc::new(EscalationRunner::new(
        Arc::new(h.escalations.clone()),
        dispatcher(registry),
        Duration::from_millis(500),
        10,
    ));
    TestServer::new(app(AlertAppState {
        processor: h.processor,
        escalations,
    }))
    .expect("Failed to create test server")
}

fn critical_quota() -> Value {
    json!({
        "alert_type": "quota_threshold",
        "severity": "critical",
        "message": "YouTube quota at 95%",
        "details": {"service": "youtube", "utilization_percent": 95},
        "source_component": "quota_monitor"
    })
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = test_server();
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    response.assert_text("ok");
}

#[tokio::test]
async fn submitting_an_alert_processes_it() {
    let server = test_server();
    let response = server.post("/api/alerts").json(&critical_quota()).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "processed");
    assert_eq!(body["enriched_alert"]["escalation_level"], 2);
    assert_eq!(body["enriched_alert"]["urgency"], "immediate");
    assert_eq!(body["delivery_plan"]["auto_escalation_minutes"], 15);
    assert_eq!(body["delivery_result"]["success"], true);
    assert_eq!(
        body["enriched_alert"]["alert_id"].as_str().map(str::len),
        Some(12)
    );
}

#[tokio::test]
async fn repeat_submission_is_throttled() {
    let server = test_server();
    let alert = json!({
        "alert_type": "dlq_spike",
        "severity": "warning",
        "message": "DLQ growing",
        "details": {"queue_name": "ingest"},
        "source_component": "dlq_monitor"
    });
    server.post("/api/alerts").json(&alert).await.assert_status_ok();

    let response = server.post("/api/alerts").json(&alert).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "throttled");
    assert!(body["reason"].as_str().unwrap().contains("minimum interval"));
    assert!(body["next_eligible_time"].is_string());
}

#[tokio::test]
async fn invalid_submission_returns_400() {
    let server = test_server();
    let response = server
        .post("/api/alerts")
        .json(&json!({
            "alert_type": "quota_threshold",
            "severity": "catastrophic",
            "message": "?",
            "source_component": "quota_monitor"
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["message"], "Unknown severity: catastrophic");

    let nested = server
        .post("/api/alerts")
        .json(&json!({
            "alert_type": "system_error",
            "severity": "error",
            "details": {"stack": {"frames": 3}},
            "source_component": "worker"
        }))
        .await;
    assert_eq!(nested.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn acknowledge_cancels_pending_escalation_once() {
    let server = test_server();
    let body: Value = server.post("/api/alerts").json(&critical_quota()).await.json();
    let alert_id = body["enriched_alert"]["alert_id"].as_str().unwrap().to_string();

    let first = server
        .post(&format!("/api/alerts/{alert_id}/acknowledge"))
        .await;
    first.assert_status_ok();
    first.assert_json(&json!({"cancelled": true}));

    let second = server
        .post(&format!("/api/alerts/{alert_id}/acknowledge"))
        .await;
    second.assert_json(&json!({"cancelled": false}));
}

#[tokio::test]
async fn api_docs_are_served() {
    let server = test_server();
    server.get("/api-docs").await.assert_status_ok();
}
