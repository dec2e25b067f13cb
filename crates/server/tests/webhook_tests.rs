use alert_engine::alerts::{Alert, AlertType, ChannelKind, EnrichedAlert, Severity, enrich};
use alert_engine::channels::{NotificationChannel, NotificationPurpose, WebhookChannel};
use alert_engine::error::ChannelError;
use serde_json::json;
use time::macros::datetime;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn enriched() -> EnrichedAlert {
    let alert = Alert::new(AlertType::StuckJobs, Severity::Error, "7 jobs stuck", "scheduler")
        .with_detail("job_type", "transcode")
        .with_detail("stuck_count", 7);
    enrich(&alert, "c0ffee000001", datetime!(2025-03-01 09:00 UTC))
}

#[tokio::test]
async fn posts_json_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/alerts"))
        .and(header("content-type", "application/json"))
        .and(body_partial_json(json!({
            "channel": "messaging",
            "escalated": false,
            "alert_id": "c0ffee000001",
            "alert_type": "stuck_jobs",
            "severity": "error",
            "urgency": "high",
            "context": {"job_type": "transcode", "stuck_count": "7"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let channel = WebhookChannel::new(
        ChannelKind::Messaging,
        &format!("{}/hooks/alerts", server.uri()),
    )
    .unwrap();
    let detail = channel
        .send(&enriched(), NotificationPurpose::Initial)
        .await
        .unwrap();
    assert_eq!(detail, "HTTP 200");
}

#[tokio::test]
async fn escalation_payload_is_marked() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"channel": "paging", "escalated": true})))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let channel = WebhookChannel::new(ChannelKind::Paging, &server.uri()).unwrap();
    channel
        .send(&enriched(), NotificationPurpose::Escalation)
        .await
        .unwrap();
}

#[tokio::test]
async fn non_success_status_is_a_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bad"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid_payload"))
        .mount(&server)
        .await;

    let down = WebhookChannel::new(ChannelKind::Phone, &format!("{}/down", server.uri())).unwrap();
    let err = down
        .send(&enriched(), NotificationPurpose::Initial)
        .await
        .unwrap_err();
    match &err {
        ChannelError::Rejected { status, context } => {
            assert_eq!(*status, 503);
            assert_eq!(context, "maintenance");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.is_retryable());

    let bad = WebhookChannel::new(ChannelKind::Phone, &format!("{}/bad", server.uri())).unwrap();
    let err = bad
        .send(&enriched(), NotificationPurpose::Initial)
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Rejected { status: 400, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let channel = WebhookChannel::new(ChannelKind::Messaging, &format!("http://{addr}/hook")).unwrap();
    let err = channel
        .send(&enriched(), NotificationPurpose::Initial)
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Transport(_)), "{err:?}");
}
