//! Alert intake and acknowledgement endpoints.
//!
//! - `POST /api/alerts` - Submit an alert occurrence
//! - `POST /api/alerts/{alert_id}/acknowledge` - Cancel a pending escalation

use crate::alerts::model::AlertSubmission;
use crate::alerts::{AlertProcessor, EscalationRunner, ProcessingResult};
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const ALERTS_TAG: &str = "Alerts API";

/// Shared state for alert endpoints.
#[derive(Clone)]
pub struct AlertAppState {
    pub processor: AlertProcessor,
    pub escalations: Arc<EscalationRunner>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcknowledgeResponse {
    /// Whether a pending escalation was cancelled.
    pub cancelled: bool,
}

/// Creates the alerts API router.
#[tracing::instrument(skip_all)]
pub fn router(alert_state: AlertAppState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(submit_alert))
        .routes(routes!(acknowledge_alert))
        .with_state(alert_state)
}

#[tracing::instrument(skip(state, submission), fields(alert_type = %submission.alert_type, severity = %submission.severity))]
#[utoipa::path(
    post,
    path = "/api/alerts",
    operation_id = "Submit Alert",
    tag = ALERTS_TAG,
    summary = "Submit an alert occurrence",
    description = "Runs one alert occurrence through deduplication, throttling, enrichment and delivery.\n\n\
                   The response `status` is one of:\n\
                   - `processed` - delivered (or attempted) with the plan and per-channel outcomes\n\
                   - `throttled` - suppressed; carries the reason and the next eligible time\n\
                   - `error` - the submission was rejected (unknown type or severity, non-scalar details, \
                   empty source component)\n\n\
                   Processing continues if the client disconnects.",
    request_body(content = AlertSubmission, description = "The raw alert"),
    responses(
        (status = 200, description = "Alert processed or throttled", body = ProcessingResult),
        (status = 400, description = "Submission rejected", body = ProcessingResult),
        (status = 500, description = "Processing task failed")
    )
)]
pub async fn submit_alert(
    State(state): State<AlertAppState>,
    Json(submission): Json<AlertSubmission>,
) -> impl IntoResponse {
    let processor = state.processor.clone();
    let task = tokio::spawn(async move { processor.process_submission(submission).await });

    match task.await {
        Ok(result) => {
            let status = match result {
                ProcessingResult::Error { .. } => StatusCode::BAD_REQUEST,
                _ => StatusCode::OK,
            };
            (status, Json(result)).into_response()
        }
        Err(e) => {
            tracing::error!(
                name = "api.alerts.task_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Alert processing task failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": "error", "message": "alert processing failed"})),
            )
                .into_response()
        }
    }
}

#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/alerts/{alert_id}/acknowledge",
    operation_id = "Acknowledge Alert",
    tag = ALERTS_TAG,
    summary = "Acknowledge an alert",
    description = "Cancels the scheduled escalation for the alert, if it has not fired yet.",
    params(
        ("alert_id" = String, Path, description = "The alert id (its fingerprint)")
    ),
    responses(
        (status = 200, description = "Acknowledged", body = AcknowledgeResponse),
        (status = 503, description = "Escalation store unavailable")
    )
)]
pub async fn acknowledge_alert(
    State(state): State<AlertAppState>,
    Path(alert_id): Path<String>,
) -> impl IntoResponse {
    match state.escalations.acknowledge(&alert_id).await {
        Ok(cancelled) => (StatusCode::OK, Json(AcknowledgeResponse { cancelled })).into_response(),
        Err(e) => {
            tracing::error!(
                name = "api.alerts.acknowledge_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                alert_id = %alert_id,
                message = "Failed to acknowledge alert"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "escalation store unavailable"})),
            )
                .into_response()
        }
    }
}
