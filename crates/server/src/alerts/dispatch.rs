//! Fan-out of an enriched alert to its planned channels.

use crate::alerts::enrich::EnrichedAlert;
use crate::alerts::planner::{ChannelKind, DeliveryPlan};
use crate::channels::{ChannelRegistry, NotificationPurpose};
use crate::error::ChannelError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChannelOutcome {
    pub channel: ChannelKind,
    pub success: bool,
    pub detail: String,
    pub duration_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResult {
    /// True iff at least one channel succeeded.
    pub success: bool,
    pub channels_succeeded: Vec<ChannelKind>,
    pub channels_failed: Vec<ChannelKind>,
    pub outcomes: Vec<ChannelOutcome>,
}

impl DeliveryResult {
    fn from_outcomes(outcomes: Vec<ChannelOutcome>) -> Self {
        let channels_succeeded: Vec<ChannelKind> = outcomes
            .iter()
            .filter(|o| o.success)
            .map(|o| o.channel)
            .collect();
        let channels_failed = outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.channel)
            .collect();
        DeliveryResult {
            success: !channels_succeeded.is_empty(),
            channels_succeeded,
            channels_failed,
            outcomes,
        }
    }

    /// Every channel in `channels` marked failed with `detail`.
    pub fn all_failed(channels: &[ChannelKind], detail: &str) -> Self {
        Self::from_outcomes(
            channels
                .iter()
                .map(|&channel| ChannelOutcome {
                    channel,
                    success: false,
                    detail: detail.to_string(),
                    duration_ms: 0,
                })
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: ChannelRegistry,
    channel_timeout: Duration,
    delivery_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: ChannelRegistry, channel_timeout: Duration, delivery_timeout: Duration) -> Self {
        Self {
            registry,
            channel_timeout,
            delivery_timeout,
        }
    }

    /// Delivers to the plan's primary channels.
    pub async fn dispatch(&self, plan: &DeliveryPlan, alert: &EnrichedAlert) -> DeliveryResult {
        self.deliver(&plan.primary_channels, alert, NotificationPurpose::Initial)
            .await
    }

    /// Attempts every channel in parallel. A channel that errors, times out or
    /// is not registered fails on its own; the others are unaffected.
    #[tracing::instrument(skip(self, alert), fields(alert_id = %alert.alert_id))]
    pub async fn deliver(
        &self,
        channels: &[ChannelKind],
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
    ) -> DeliveryResult {
        let timeout = self.channel_timeout.min(self.delivery_timeout);
        let attempts = channels
            .iter()
            .map(|&kind| self.attempt(kind, alert, purpose, timeout));
        DeliveryResult::from_outcomes(join_all(attempts).await)
    }

    async fn attempt(
        &self,
        kind: ChannelKind,
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
        timeout: Duration,
    ) -> ChannelOutcome {
        let started = Instant::now();
        let result = match self.registry.get(kind) {
            None => Err(ChannelError::NotConfigured(kind.to_string())),
            Some(channel) => match tokio::time::timeout(timeout, channel.send(alert, purpose)).await {
                Ok(result) => result,
                Err(_) => Err(ChannelError::Timeout(timeout)),
            },
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(detail) => {
                tracing::debug!(
                    name = "alerts.dispatch.channel_ok",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    channel = %kind,
                    alert_id = %alert.alert_id,
                    duration_ms,
                    message = "Channel delivered alert"
                );
                ChannelOutcome {
                    channel: kind,
                    success: true,
                    detail,
                    duration_ms,
                }
            }
            Err(e) => {
                tracing::warn!(
                    name = "alerts.dispatch.channel_failed",
                    target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                    channel = %kind,
                    alert_id = %alert.alert_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    duration_ms,
                    message = "Channel failed to deliver alert"
                );
                ChannelOutcome {
                    channel: kind,
                    success: false,
                    detail: e.to_string(),
                    duration_ms,
                }
            }
        }
    }
}
