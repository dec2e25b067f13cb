//! Derived routing fields and per-type context for an alert.

use crate::alerts::model::{Alert, AlertType, DetailValue, Severity};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Immediate,
}

impl Urgency {
    /// The urgency a severity carries on its own.
    pub fn for_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Urgency::Immediate,
            Severity::Error => Urgency::High,
            Severity::Warning => Urgency::Medium,
            Severity::Info => Urgency::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
            Urgency::Immediate => "immediate",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
}

impl Impact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Low => "low",
            Impact::Medium => "medium",
            Impact::High => "high",
        }
    }
}

/// Type-specific projection of the alert details.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertContext {
    QuotaThreshold {
        service: Option<DetailValue>,
        quota_type: Option<DetailValue>,
        current_usage: Option<DetailValue>,
        limit: Option<DetailValue>,
        utilization_percent: Option<DetailValue>,
        time_to_reset: Option<DetailValue>,
    },
    DlqSpike {
        queue_name: Option<DetailValue>,
        message_count: Option<DetailValue>,
        threshold: Option<DetailValue>,
        oldest_message_age: Option<DetailValue>,
    },
    StuckJobs {
        job_type: Option<DetailValue>,
        stuck_count: Option<DetailValue>,
        oldest_job_age: Option<DetailValue>,
        worker: Option<DetailValue>,
    },
    CostBudget {
        service: Option<DetailValue>,
        current_spend: Option<DetailValue>,
        budget: Option<DetailValue>,
        utilization_percent: Option<DetailValue>,
        period: Option<DetailValue>,
    },
    SystemError {
        component: Option<DetailValue>,
        error_type: Option<DetailValue>,
        error_count: Option<DetailValue>,
        last_error: Option<DetailValue>,
    },
    PerformanceDegradation {
        component: Option<DetailValue>,
        metric: Option<DetailValue>,
        current_value: Option<DetailValue>,
        baseline: Option<DetailValue>,
    },
}

impl AlertContext {
    pub fn from_alert(alert: &Alert) -> Self {
        let get = |key: &str| alert.detail(key).cloned();
        match alert.alert_type {
            AlertType::QuotaThreshold => AlertContext::QuotaThreshold {
                service: get("service"),
                quota_type: get("quota_type"),
                current_usage: get("current_usage"),
                limit: get("limit"),
                utilization_percent: get("utilization_percent"),
                time_to_reset: get("time_to_reset"),
            },
            AlertType::DlqSpike => AlertContext::DlqSpike {
                queue_name: get("queue_name"),
                message_count: get("message_count"),
                threshold: get("threshold"),
                oldest_message_age: get("oldest_message_age"),
            },
            AlertType::StuckJobs => AlertContext::StuckJobs {
                job_type: get("job_type"),
                stuck_count: get("stuck_count"),
                oldest_job_age: get("oldest_job_age"),
                worker: get("worker"),
            },
            AlertType::CostBudget => AlertContext::CostBudget {
                service: get("service"),
                current_spend: get("current_spend"),
                budget: get("budget"),
                utilization_percent: get("utilization_percent"),
                period: get("period"),
            },
            AlertType::SystemError => AlertContext::SystemError {
                component: get("component"),
                error_type: get("error_type"),
                error_count: get("error_count"),
                last_error: get("last_error"),
            },
            AlertType::PerformanceDegradation => AlertContext::PerformanceDegradation {
                component: get("component"),
                metric: get("metric"),
                current_value: get("current_value"),
                baseline: get("baseline"),
            },
        }
    }

    /// Present fields as `(label, value)` pairs, in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, &DetailValue)> {
        let pairs: Vec<(&'static str, &Option<DetailValue>)> = match self {
            AlertContext::QuotaThreshold {
                service,
                quota_type,
                current_usage,
                limit,
                utilization_percent,
                time_to_reset,
            } => vec![
                ("service", service),
                ("quota_type", quota_type),
                ("current_usage", current_usage),
                ("limit", limit),
                ("utilization_percent", utilization_percent),
                ("time_to_reset", time_to_reset),
            ],
            AlertContext::DlqSpike {
                queue_name,
                message_count,
                threshold,
                oldest_message_age,
            } => vec![
                ("queue_name", queue_name),
                ("message_count", message_count),
                ("threshold", threshold),
                ("oldest_message_age", oldest_message_age),
            ],
            AlertContext::StuckJobs {
                job_type,
                stuck_count,
                oldest_job_age,
                worker,
            } => vec![
                ("job_type", job_type),
                ("stuck_count", stuck_count),
                ("oldest_job_age", oldest_job_age),
                ("worker", worker),
            ],
            AlertContext::CostBudget {
                service,
                current_spend,
                budget,
                utilization_percent,
                period,
            } => vec![
                ("service", service),
                ("current_spend", current_spend),
                ("budget", budget),
                ("utilization_percent", utilization_percent),
                ("period", period),
            ],
            AlertContext::SystemError {
                component,
                error_type,
                error_count,
                last_error,
            } => vec![
                ("component", component),
                ("error_type", error_type),
                ("error_count", error_count),
                ("last_error", last_error),
            ],
            AlertContext::PerformanceDegradation {
                component,
                metric,
                current_value,
                baseline,
            } => vec![
                ("component", component),
                ("metric", metric),
                ("current_value", current_value),
                ("baseline", baseline),
            ],
        };
        pairs
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| (label, v)))
            .collect()
    }
}

/// Canned remediation steps per alert type.
pub fn recommended_actions(alert_type: AlertType) -> &'static [&'static str] {
    match alert_type {
        AlertType::QuotaThreshold => &[
            "Review current API usage patterns for the affected service",
            "Pause or reschedule non-critical ingestion jobs until the quota resets",
            "Request a quota increase if the usage is expected to continue",
        ],
        AlertType::DlqSpike => &[
            "Inspect the most recent dead-lettered messages for a common failure",
            "Fix the failing consumer, then replay the dead-letter queue",
        ],
        AlertType::StuckJobs => &[
            "Check worker health and restart unresponsive workers",
            "Requeue or cancel jobs that exceeded their expected runtime",
            "Look for locks or external dependencies blocking progress",
        ],
        AlertType::CostBudget => &[
            "Identify the services driving the spend increase",
            "Throttle or disable optional processing until the period resets",
            "Adjust the budget if the increase is planned",
        ],
        AlertType::SystemError => &[
            "Check the component logs around the reported time",
            "Verify the health of upstream dependencies",
            "Roll back the most recent deployment if errors started after it",
        ],
        AlertType::PerformanceDegradation => &[
            "Compare the current metric with its baseline on the dashboards",
            "Scale out the affected component or shed non-essential load",
        ],
    }
}

/// An alert together with everything routing needs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EnrichedAlert {
    /// Equal to the alert's fingerprint.
    pub alert_id: String,
    #[serde(with = "time::serde::rfc3339")]
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: OffsetDateTime,
    pub alert: Alert,
    pub escalation_level: u8,
    pub urgency: Urgency,
    pub impact: Impact,
    pub recommended_actions: Vec<String>,
    pub context: AlertContext,
}

impl EnrichedAlert {
    pub fn severity(&self) -> Severity {
        self.alert.severity
    }

    pub fn alert_type(&self) -> AlertType {
        self.alert.alert_type
    }
}

pub fn escalation_level(alert: &Alert) -> u8 {
    match alert.severity {
        Severity::Critical => 2,
        Severity::Error
            if matches!(
                alert.alert_type,
                AlertType::SystemError | AlertType::QuotaThreshold
            ) =>
        {
            1
        }
        _ if alert.override_throttling => 1,
        _ => 0,
    }
}

pub fn urgency(alert: &Alert) -> Urgency {
    if alert.override_throttling {
        Urgency::Immediate
    } else {
        Urgency::for_severity(alert.severity)
    }
}

pub fn impact(alert: &Alert) -> Impact {
    match (alert.alert_type, alert.severity) {
        (AlertType::QuotaThreshold | AlertType::SystemError | AlertType::StuckJobs, _)
        | (_, Severity::Critical) => Impact::High,
        (AlertType::DlqSpike | AlertType::CostBudget, _) | (_, Severity::Error) => Impact::Medium,
        _ => Impact::Low,
    }
}

pub fn enrich(alert: &Alert, fingerprint: &str, now: OffsetDateTime) -> EnrichedAlert {
    EnrichedAlert {
        alert_id: fingerprint.to_string(),
        timestamp: now,
        escalation_level: escalation_level(alert),
        urgency: urgency(alert),
        impact: impact(alert),
        recommended_actions: recommended_actions(alert.alert_type)
            .iter()
            .map(ToString::to_string)
            .collect(),
        context: AlertContext::from_alert(alert),
        alert: alert.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn alert(alert_type: AlertType, severity: Severity) -> Alert {
        Alert::new(alert_type, severity, "m", "src")
    }

    #[test]
    fn escalation_levels() {
        assert_eq!(escalation_level(&alert(AlertType::DlqSpike, Severity::Critical)), 2);
        assert_eq!(escalation_level(&alert(AlertType::SystemError, Severity::Error)), 1);
        assert_eq!(escalation_level(&alert(AlertType::QuotaThreshold, Severity::Error)), 1);
        assert_eq!(escalation_level(&alert(AlertType::DlqSpike, Severity::Error)), 0);
        assert_eq!(
            escalation_level(&alert(AlertType::DlqSpike, Severity::Info).with_override(true)),
            1
        );
        assert_eq!(
            escalation_level(&alert(AlertType::DlqSpike, Severity::Critical).with_override(true)),
            2
        );
    }

    #[test]
    fn urgency_follows_severity_unless_overridden() {
        assert_eq!(urgency(&alert(AlertType::CostBudget, Severity::Critical)), Urgency::Immediate);
        assert_eq!(urgency(&alert(AlertType::CostBudget, Severity::Error)), Urgency::High);
        assert_eq!(urgency(&alert(AlertType::CostBudget, Severity::Warning)), Urgency::Medium);
        assert_eq!(urgency(&alert(AlertType::CostBudget, Severity::Info)), Urgency::Low);
        assert_eq!(
            urgency(&alert(AlertType::CostBudget, Severity::Info).with_override(true)),
            Urgency::Immediate
        );
    }

    #[test]
    fn impact_by_type_then_severity() {
        assert_eq!(impact(&alert(AlertType::StuckJobs, Severity::Info)), Impact::High);
        assert_eq!(impact(&alert(AlertType::PerformanceDegradation, Severity::Critical)), Impact::High);
        assert_eq!(impact(&alert(AlertType::DlqSpike, Severity::Info)), Impact::Medium);
        assert_eq!(impact(&alert(AlertType::PerformanceDegradation, Severity::Error)), Impact::Medium);
        assert_eq!(impact(&alert(AlertType::PerformanceDegradation, Severity::Warning)), Impact::Low);
    }

    #[test]
    fn every_type_has_two_or_three_actions() {
        for t in AlertType::ALL {
            let n = recommended_actions(t).len();
            assert!((2..=3).contains(&n), "{t} has {n} actions");
        }
    }

    #[test]
    fn quota_context_projects_details() {
        let a = Alert::new(AlertType::QuotaThreshold, Severity::Critical, "m", "quota_monitor")
            .with_detail("service", "youtube")
            .with_detail("utilization_percent", 95)
            .with_detail("unrelated", "x");
        let enriched = enrich(&a, "0123456789ab", datetime!(2025-01-01 00:00 UTC));

        assert_eq!(enriched.alert_id, "0123456789ab");
        let fields = enriched.context.fields();
        assert_eq!(
            fields,
            vec![
                ("service", &DetailValue::Text("youtube".into())),
                ("utilization_percent", &DetailValue::Integer(95)),
            ]
        );
    }

    #[test]
    fn enriched_alert_survives_json() {
        let a = Alert::new(AlertType::StuckJobs, Severity::Warning, "m", "scheduler")
            .with_detail("job_type", "transcode")
            .with_detail("stuck_count", 4);
        let enriched = enrich(&a, "fp", datetime!(2025-01-01 00:00 UTC));
        let json = serde_json::to_string(&enriched).unwrap();
        let back: EnrichedAlert = serde_json::from_str(&json).unwrap();
        assert_eq!(back, enriched);
    }
}
