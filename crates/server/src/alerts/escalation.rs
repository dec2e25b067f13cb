//! Deferred escalation: scheduling, firing and acknowledgement.
//!
//! A record moves `scheduled -> fired` when its runner wins the status
//! compare-and-swap, or `scheduled -> cancelled` when the alert is
//! acknowledged first. Both transitions are terminal.

use crate::alerts::dispatch::{DeliveryResult, Dispatcher};
use crate::alerts::enrich::EnrichedAlert;
use crate::alerts::planner::DeliveryPlan;
use crate::channels::NotificationPurpose;
use crate::error::StoreError;
use crate::store::{EscalationRecord, EscalationStatus, EscalationStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{interval, timeout};

async fn timed<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}

/// Persists an escalation if the plan carries an auto-escalation timer.
///
/// A repeat occurrence while an escalation is still pending leaves it as is
/// and returns the pending record. Best effort: a store failure is logged and
/// yields `None`.
#[tracing::instrument(skip(store, alert, plan), fields(alert_id = %alert.alert_id))]
pub async fn schedule(
    store: &dyn EscalationStore,
    alert: &EnrichedAlert,
    plan: &DeliveryPlan,
    now: OffsetDateTime,
    store_timeout: Duration,
) -> Option<EscalationRecord> {
    let minutes = plan.auto_escalation_minutes?;
    let record = EscalationRecord {
        alert_id: alert.alert_id.clone(),
        escalation_time: now + time::Duration::minutes(i64::from(minutes)),
        escalation_channels: plan.escalation_channels.clone(),
        status: EscalationStatus::Scheduled,
        created_at: now,
        alert: alert.clone(),
    };

    match timed(store_timeout, store.put(&record)).await {
        Ok(false) => {
            tracing::debug!(
                name = "alerts.escalation.already_pending",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                alert_id = %record.alert_id,
                message = "Escalation already pending, keeping its deadline"
            );
            timed(store_timeout, store.get(&record.alert_id))
                .await
                .ok()
                .flatten()
        }
        Ok(true) => {
            tracing::debug!(
                name = "alerts.escalation.scheduled",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                alert_id = %record.alert_id,
                escalation_time = %record.escalation_time,
                message = "Escalation scheduled"
            );
            Some(record)
        }
        Err(e) => {
            tracing::error!(
                name = "alerts.escalation.schedule_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                alert_id = %alert.alert_id,
                message = "Failed to persist escalation record"
            );
            None
        }
    }
}

/// Counts from one [`EscalationRunner::fire_due`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FireSummary {
    /// Records this runner moved to `fired`.
    pub fired: usize,
    /// Records another runner or an acknowledgement got to first.
    pub skipped: usize,
    /// Fired records whose escalation channels all failed.
    pub undelivered: usize,
}

pub struct EscalationRunner {
    store: Arc<dyn EscalationStore>,
    dispatcher: Dispatcher,
    store_timeout: Duration,
    batch_size: u64,
}

impl EscalationRunner {
    pub fn new(
        store: Arc<dyn EscalationStore>,
        dispatcher: Dispatcher,
        store_timeout: Duration,
        batch_size: u64,
    ) -> Self {
        Self {
            store,
            dispatcher,
            store_timeout,
            batch_size,
        }
    }

    /// Fires every scheduled record due at `now`, at most `batch_size` per call.
    #[tracing::instrument(skip(self))]
    pub async fn fire_due(&self, now: OffsetDateTime) -> Result<FireSummary, StoreError> {
        let due = timed(self.store_timeout, self.store.list_due(now, self.batch_size)).await?;
        let mut summary = FireSummary::default();

        for record in due {
            let won = match timed(
                self.store_timeout,
                self.store.transition(
                    &record.alert_id,
                    EscalationStatus::Scheduled,
                    EscalationStatus::Fired,
                ),
            )
            .await
            {
                Ok(won) => won,
                Err(e) => {
                    tracing::warn!(
                        name = "alerts.escalation.transition_failed",
                        target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                        error = %e,
                        alert_id = %record.alert_id,
                        message = "Could not claim escalation, leaving it for the next pass"
                    );
                    continue;
                }
            };
            if !won {
                summary.skipped += 1;
                continue;
            }
            summary.fired += 1;

            if record.escalation_channels.is_empty() {
                tracing::info!(
                    name = "alerts.escalation.no_channels",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    alert_id = %record.alert_id,
                    message = "Escalation fired without escalation channels"
                );
                continue;
            }

            let result: DeliveryResult = self
                .dispatcher
                .deliver(
                    &record.escalation_channels,
                    &record.alert,
                    NotificationPurpose::Escalation,
                )
                .await;
            if !result.success {
                summary.undelivered += 1;
            }
            tracing::info!(
                name = "alerts.escalation.fired",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                alert_id = %record.alert_id,
                success = result.success,
                channels_failed = ?result.channels_failed,
                message = "Escalation fired"
            );
        }

        Ok(summary)
    }

    /// Cancels the pending escalation for `alert_id`. Returns whether one was pending.
    #[tracing::instrument(skip(self))]
    pub async fn acknowledge(&self, alert_id: &str) -> Result<bool, StoreError> {
        let cancelled = timed(
            self.store_timeout,
            self.store.transition(
                alert_id,
                EscalationStatus::Scheduled,
                EscalationStatus::Cancelled,
            ),
        )
        .await?;
        tracing::info!(
            name = "alerts.escalation.acknowledged",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            alert_id = %alert_id,
            cancelled,
            message = "Alert acknowledged"
        );
        Ok(cancelled)
    }
}

/// Runs [`EscalationRunner::fire_due`] every `poll_interval`, forever.
pub async fn escalation_loop(runner: Arc<EscalationRunner>, poll_interval: Duration) {
    let mut ticker = interval(poll_interval);
    loop {
        ticker.tick().await;
        match runner.fire_due(OffsetDateTime::now_utc()).await {
            Ok(summary) if summary.fired > 0 || summary.skipped > 0 => {
                tracing::info!(
                    name = "alerts.escalation.pass",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    fired = summary.fired,
                    skipped = summary.skipped,
                    undelivered = summary.undelivered,
                    message = "Escalation pass complete"
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(
                    name = "alerts.escalation.pass_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    error = %e,
                    message = "Failed to list due escalations"
                );
            }
        }
    }
}
