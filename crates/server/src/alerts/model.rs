//! Alert input types and boundary validation.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// The closed set of alert kinds the engine understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    QuotaThreshold,
    DlqSpike,
    StuckJobs,
    CostBudget,
    SystemError,
    PerformanceDegradation,
}

impl AlertType {
    pub const ALL: [AlertType; 6] = [
        AlertType::QuotaThreshold,
        AlertType::DlqSpike,
        AlertType::StuckJobs,
        AlertType::CostBudget,
        AlertType::SystemError,
        AlertType::PerformanceDegradation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::QuotaThreshold => "quota_threshold",
            AlertType::DlqSpike => "dlq_spike",
            AlertType::StuckJobs => "stuck_jobs",
            AlertType::CostBudget => "cost_budget",
            AlertType::SystemError => "system_error",
            AlertType::PerformanceDegradation => "performance_degradation",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AlertType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownAlertType(s.to_string()))
    }
}

/// Alert severity. The derived ordering is `Info < Warning < Error < Critical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownSeverity(s.to_string()))
    }
}

/// A scalar context value attached to an alert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum DetailValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl DetailValue {
    fn from_json(key: &str, value: serde_json::Value) -> Result<Self, ValidationError> {
        match value {
            serde_json::Value::Bool(b) => Ok(DetailValue::Bool(b)),
            serde_json::Value::String(s) => Ok(DetailValue::Text(s)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(DetailValue::Integer(i)),
                None => n
                    .as_f64()
                    .map(DetailValue::Float)
                    .ok_or_else(|| ValidationError::NonScalarDetail(key.to_string())),
            },
            _ => Err(ValidationError::NonScalarDetail(key.to_string())),
        }
    }
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailValue::Bool(b) => write!(f, "{b}"),
            DetailValue::Integer(i) => write!(f, "{i}"),
            DetailValue::Float(v) => write!(f, "{v}"),
            DetailValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for DetailValue {
    fn from(s: &str) -> Self {
        DetailValue::Text(s.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(s: String) -> Self {
        DetailValue::Text(s)
    }
}

impl From<i64> for DetailValue {
    fn from(i: i64) -> Self {
        DetailValue::Integer(i)
    }
}

impl From<i32> for DetailValue {
    fn from(i: i32) -> Self {
        DetailValue::Integer(i64::from(i))
    }
}

impl From<f64> for DetailValue {
    fn from(v: f64) -> Self {
        DetailValue::Float(v)
    }
}

impl From<bool> for DetailValue {
    fn from(b: bool) -> Self {
        DetailValue::Bool(b)
    }
}

pub type Details = BTreeMap<String, DetailValue>;

/// A validated alert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub details: Details,
    pub source_component: String,
    #[serde(default)]
    pub override_throttling: bool,
}

impl Alert {
    pub fn new(
        alert_type: AlertType,
        severity: Severity,
        message: impl Into<String>,
        source_component: impl Into<String>,
    ) -> Self {
        Self {
            alert_type,
            severity,
            message: message.into(),
            details: Details::new(),
            source_component: source_component.into(),
            override_throttling: false,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<DetailValue>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_override(mut self, override_throttling: bool) -> Self {
        self.override_throttling = override_throttling;
        self
    }

    pub fn detail(&self, key: &str) -> Option<&DetailValue> {
        self.details.get(key)
    }
}

/// Untyped alert as producers submit it. Converted into [`Alert`] at the boundary.
#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct AlertSubmission {
    pub alert_type: String,
    pub severity: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub details: serde_json::Map<String, serde_json::Value>,
    pub source_component: String,
    #[serde(default)]
    pub override_throttling: bool,
}

impl TryFrom<AlertSubmission> for Alert {
    type Error = ValidationError;

    fn try_from(raw: AlertSubmission) -> Result<Self, Self::Error> {
        let alert_type: AlertType = raw.alert_type.trim().to_ascii_lowercase().parse()?;
        let severity: Severity = raw.severity.trim().to_ascii_lowercase().parse()?;
        let source_component = raw.source_component.trim().to_string();
        if source_component.is_empty() {
            return Err(ValidationError::MissingSourceComponent);
        }
        let details = raw
            .details
            .into_iter()
            .map(|(k, v)| DetailValue::from_json(&k, v).map(|v| (k, v)))
            .collect::<Result<Details, _>>()?;

        Ok(Alert {
            alert_type,
            severity,
            message: raw.message,
            details,
            source_component,
            override_throttling: raw.override_throttling,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(value: serde_json::Value) -> AlertSubmission {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn severity_is_strictly_ordered() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Critical);
    }

    #[test]
    fn alert_type_round_trips_through_str() {
        for t in AlertType::ALL {
            assert_eq!(t.as_str().parse::<AlertType>().unwrap(), t);
        }
    }

    #[test]
    fn submission_converts_scalars() {
        let alert = Alert::try_from(submission(json!({
            "alert_type": "quota_threshold",
            "severity": "CRITICAL",
            "message": "quota nearly exhausted",
            "details": {"service": "youtube", "utilization_percent": 95, "ratio": 0.95, "hard": true},
            "source_component": "quota_monitor"
        })))
        .unwrap();

        assert_eq!(alert.alert_type, AlertType::QuotaThreshold);
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.detail("service"), Some(&DetailValue::Text("youtube".into())));
        assert_eq!(alert.detail("utilization_percent"), Some(&DetailValue::Integer(95)));
        assert_eq!(alert.detail("ratio"), Some(&DetailValue::Float(0.95)));
        assert_eq!(alert.detail("hard"), Some(&DetailValue::Bool(true)));
        assert!(!alert.override_throttling);
    }

    #[test]
    fn type_and_severity_are_case_insensitive() {
        let alert = Alert::try_from(submission(json!({
            "alert_type": " Quota_Threshold ",
            "severity": "Warning",
            "source_component": "quota_monitor"
        })))
        .unwrap();
        assert_eq!(alert.alert_type, AlertType::QuotaThreshold);
        assert_eq!(alert.severity, Severity::Warning);
    }

    #[test]
    fn submission_rejects_unknown_type() {
        let err = Alert::try_from(submission(json!({
            "alert_type": "disk_full",
            "severity": "error",
            "source_component": "x"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownAlertType("disk_full".into()));
    }

    #[test]
    fn submission_rejects_unknown_severity() {
        let err = Alert::try_from(submission(json!({
            "alert_type": "dlq_spike",
            "severity": "fatal",
            "source_component": "x"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::UnknownSeverity("fatal".into()));
    }

    #[test]
    fn submission_rejects_nested_details() {
        let err = Alert::try_from(submission(json!({
            "alert_type": "dlq_spike",
            "severity": "error",
            "details": {"queue": {"name": "q"}},
            "source_component": "x"
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::NonScalarDetail("queue".into()));
    }

    #[test]
    fn submission_requires_source_component() {
        let err = Alert::try_from(submission(json!({
            "alert_type": "dlq_spike",
            "severity": "error",
            "source_component": "   "
        })))
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingSourceComponent);
    }
}
