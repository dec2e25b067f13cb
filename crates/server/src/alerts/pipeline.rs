//! The alert processing entry point.
//!
//! fingerprint -> throttle check -> enrich -> plan -> dispatch (+ escalation)
//! -> throttle record update -> audit.

use crate::alerts::dispatch::{DeliveryResult, Dispatcher};
use crate::alerts::enrich::{EnrichedAlert, enrich};
use crate::alerts::escalation;
use crate::alerts::fingerprint::fingerprint;
use crate::alerts::model::{Alert, AlertSubmission};
use crate::alerts::planner::{self, DeliveryPlan};
use crate::alerts::throttle::should_throttle;
use crate::config::PipelineConfig;
use crate::error::ChannelError;
use crate::logging::AlertWideEvent;
use crate::store::{
    AuditEntry, AuditSink, DeliveryStatus, EscalationStore, ThrottleStore, ThrottleUpdate,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::time::timeout;
use tracing::Instrument;
use utoipa::ToSchema;

/// Outcome of [`AlertProcessor::process_alert`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingResult {
    Throttled {
        reason: String,
        #[serde(with = "time::serde::rfc3339::option")]
        #[schema(value_type = Option<String>, format = DateTime)]
        next_eligible_time: Option<OffsetDateTime>,
    },
    Processed {
        enriched_alert: Box<EnrichedAlert>,
        delivery_plan: DeliveryPlan,
        delivery_result: DeliveryResult,
    },
    /// Only produced for submissions rejected at the boundary.
    Error { message: String },
}

impl ProcessingResult {
    pub fn status(&self) -> &'static str {
        match self {
            ProcessingResult::Throttled { .. } => "throttled",
            ProcessingResult::Processed { .. } => "processed",
            ProcessingResult::Error { .. } => "error",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub store_timeout: Duration,
    pub actor: String,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            store_timeout: config.store_timeout(),
            actor: config.actor.clone(),
        }
    }
}

/// Runs alerts through the pipeline. Holds no mutable state of its own, so
/// clones may process alerts concurrently.
#[derive(Clone)]
pub struct AlertProcessor {
    throttle_store: Arc<dyn ThrottleStore>,
    escalation_store: Arc<dyn EscalationStore>,
    audit_sink: Arc<dyn AuditSink>,
    dispatcher: Dispatcher,
    settings: PipelineSettings,
}

impl AlertProcessor {
    pub fn new(
        throttle_store: Arc<dyn ThrottleStore>,
        escalation_store: Arc<dyn EscalationStore>,
        audit_sink: Arc<dyn AuditSink>,
        dispatcher: Dispatcher,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            throttle_store,
            escalation_store,
            audit_sink,
            dispatcher,
            settings,
        }
    }

    /// Validates a raw submission, then processes it.
    pub async fn process_submission(&self, submission: AlertSubmission) -> ProcessingResult {
        match Alert::try_from(submission) {
            Ok(alert) => self.process_alert(alert).await,
            Err(e) => {
                tracing::warn!(
                    name = "alerts.pipeline.rejected",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %e,
                    message = "Rejected alert submission"
                );
                ProcessingResult::Error {
                    message: e.to_string(),
                }
            }
        }
    }

    pub async fn process_alert(&self, alert: Alert) -> ProcessingResult {
        self.process_alert_until(alert, std::future::pending::<()>())
            .await
    }

    /// Like [`Self::process_alert`], but abandons outstanding channel attempts
    /// once `cancel` completes. The throttle record and the audit row are
    /// written either way.
    pub async fn process_alert_until<C>(&self, alert: Alert, cancel: C) -> ProcessingResult
    where
        C: Future<Output = ()>,
    {
        let evt = AlertWideEvent::new();
        let started = Instant::now();
        let span = evt.span().clone();
        let result = self.run(alert, cancel, &evt).instrument(span).await;
        evt.add("outcome", result.status());
        evt.add("duration_ms", started.elapsed().as_millis() as u64);
        match &result {
            ProcessingResult::Processed {
                delivery_result, ..
            } if !delivery_result.success => evt.warn("alert delivered to no channel"),
            _ => evt.info("alert processed"),
        }
        result
    }

    async fn run<C>(&self, alert: Alert, cancel: C, evt: &AlertWideEvent) -> ProcessingResult
    where
        C: Future<Output = ()>,
    {
        let now = OffsetDateTime::now_utc();
        let fp = fingerprint(&alert);
        evt.add("fingerprint", &fp);
        evt.add("alert_type", alert.alert_type);
        evt.add("severity", alert.severity);
        evt.add("source_component", &alert.source_component);
        evt.add("override_throttling", alert.override_throttling);

        let decision = should_throttle(
            self.throttle_store.as_ref(),
            &fp,
            alert.severity,
            alert.override_throttling,
            now,
            self.settings.store_timeout,
        )
        .await;

        if decision.throttle {
            evt.add("throttle_reason", &decision.reason);
            self.audit(&alert, &fp, DeliveryStatus::Throttled, now).await;
            return ProcessingResult::Throttled {
                reason: decision.reason,
                next_eligible_time: decision.next_eligible_time,
            };
        }

        let enriched = enrich(&alert, &fp, now);
        let plan = planner::plan(&enriched);
        evt.add("escalation_level", enriched.escalation_level);
        evt.add_list("channels_planned", &plan.primary_channels);

        let delivery = tokio::select! {
            result = self.dispatcher.dispatch(&plan, &enriched) => result,
            _ = cancel => {
                tracing::warn!(
                    name = "alerts.pipeline.cancelled",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    fingerprint = %fp,
                    message = "Delivery cancelled, committing throttle update and audit"
                );
                DeliveryResult::all_failed(&plan.primary_channels, &ChannelError::Cancelled.to_string())
            }
        };
        evt.add_list("channels_succeeded", &delivery.channels_succeeded);
        evt.add_list("channels_failed", &delivery.channels_failed);

        let scheduled = escalation::schedule(
            self.escalation_store.as_ref(),
            &enriched,
            &plan,
            now,
            self.settings.store_timeout,
        )
        .await;
        evt.add("escalation_scheduled", scheduled.is_some());
        evt.add_opt(
            "escalation_time",
            scheduled.as_ref().map(|r| r.escalation_time),
        );

        self.record_delivery(&alert, &fp, now).await;
        let status = if delivery.success {
            DeliveryStatus::Delivered
        } else {
            DeliveryStatus::Failed
        };
        self.audit(&alert, &fp, status, now).await;

        ProcessingResult::Processed {
            enriched_alert: Box::new(enriched),
            delivery_plan: plan,
            delivery_result: delivery,
        }
    }

    /// Merges this attempt into the throttle record. Failures are logged only.
    async fn record_delivery(&self, alert: &Alert, fp: &str, now: OffsetDateTime) {
        let update = ThrottleUpdate {
            alert_type: alert.alert_type,
            severity: alert.severity,
            source_component: alert.source_component.clone(),
            message: alert.message.clone(),
            at: now,
        };
        match timeout(
            self.settings.store_timeout,
            self.throttle_store.upsert(fp, update),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                name = "alerts.pipeline.throttle_update_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                fingerprint = %fp,
                message = "Failed to update throttle record"
            ),
            Err(_) => tracing::error!(
                name = "alerts.pipeline.throttle_update_timeout",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                fingerprint = %fp,
                message = "Throttle record update timed out"
            ),
        }
    }

    async fn audit(&self, alert: &Alert, fp: &str, status: DeliveryStatus, now: OffsetDateTime) {
        let entry = AuditEntry {
            alert_type: alert.alert_type,
            severity: alert.severity,
            alert_id: fp.to_string(),
            delivery_status: status,
            actor: self.settings.actor.clone(),
            recorded_at: now,
        };
        match timeout(self.settings.store_timeout, self.audit_sink.record(entry)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                name = "alerts.pipeline.audit_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                alert_id = %fp,
                delivery_status = %status,
                message = "Failed to write audit entry"
            ),
            Err(_) => tracing::error!(
                name = "alerts.pipeline.audit_timeout",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                alert_id = %fp,
                delivery_status = %status,
                message = "Audit write timed out"
            ),
        }
    }
}
