//! Suppression decisions for repeated alerts.
//!
//! Each severity has a window during which a previous delivery still counts,
//! and a minimum interval between deliveries that grows by 1.5x per prior send
//! (capped at five repetitions).

use crate::alerts::model::Severity;
use crate::store::{ThrottleRecord, ThrottleStore};
use serde::Serialize;
use time::{Duration, OffsetDateTime};
use tokio::time::timeout;

/// Growth factor applied per previous delivery.
pub const BACKOFF_FACTOR: f64 = 1.5;
/// Number of previous deliveries after which the interval stops growing.
pub const BACKOFF_CAP: u32 = 5;

/// Span in which a previous delivery is considered at all.
pub fn throttle_window(severity: Severity) -> Duration {
    match severity {
        Severity::Critical => Duration::minutes(5),
        Severity::Error => Duration::minutes(15),
        Severity::Warning => Duration::minutes(30),
        Severity::Info => Duration::minutes(60),
    }
}

pub fn min_interval(severity: Severity) -> Duration {
    match severity {
        Severity::Critical => Duration::minutes(2),
        Severity::Error => Duration::minutes(5),
        Severity::Warning => Duration::minutes(15),
        Severity::Info => Duration::minutes(30),
    }
}

/// `min_interval * 1.5^min(send_count, 5)`.
pub fn adjusted_interval(severity: Severity, send_count: u32) -> Duration {
    let exponent = send_count.min(BACKOFF_CAP) as i32;
    min_interval(severity) * BACKOFF_FACTOR.powi(exponent)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThrottleDecision {
    pub throttle: bool,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_eligible_time: Option<OffsetDateTime>,
}

impl ThrottleDecision {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            throttle: false,
            reason: reason.into(),
            next_eligible_time: None,
        }
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.whole_seconds();
    if secs >= 60 {
        format!("{}m{:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

/// Decides from an already loaded record. Pure, so it is usable from tests and
/// from callers that hold the record already.
pub fn evaluate(
    record: Option<&ThrottleRecord>,
    severity: Severity,
    override_throttling: bool,
    now: OffsetDateTime,
) -> ThrottleDecision {
    if override_throttling {
        return ThrottleDecision::allow("throttling overridden");
    }
    let Some(record) = record else {
        return ThrottleDecision::allow("first occurrence");
    };

    let elapsed = now - record.last_sent;
    if elapsed > throttle_window(severity) {
        return ThrottleDecision::allow("previous delivery outside throttle window");
    }

    let required = adjusted_interval(severity, record.send_count);
    if elapsed < required {
        return ThrottleDecision {
            throttle: true,
            reason: format!(
                "last sent {} ago, minimum interval is {} after {} previous deliveries",
                format_duration(elapsed),
                format_duration(required),
                record.send_count
            ),
            next_eligible_time: Some(record.last_sent + required),
        };
    }

    ThrottleDecision::allow("minimum interval elapsed")
}

/// Looks up the record for `fingerprint` and decides whether to suppress.
///
/// Store errors and timeouts never suppress an alert.
#[tracing::instrument(skip(store))]
pub async fn should_throttle(
    store: &dyn ThrottleStore,
    fingerprint: &str,
    severity: Severity,
    override_throttling: bool,
    now: OffsetDateTime,
    store_timeout: std::time::Duration,
) -> ThrottleDecision {
    if override_throttling {
        return evaluate(None, severity, true, now);
    }

    match timeout(store_timeout, store.get(fingerprint)).await {
        Ok(Ok(record)) => evaluate(record.as_ref(), severity, false, now),
        Ok(Err(e)) => {
            tracing::warn!(
                name = "alerts.throttle.lookup_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                fingerprint = %fingerprint,
                message = "Throttle store lookup failed, not throttling"
            );
            ThrottleDecision::allow("throttle store unavailable")
        }
        Err(_) => {
            tracing::warn!(
                name = "alerts.throttle.lookup_timeout",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                timeout_ms = store_timeout.as_millis() as u64,
                fingerprint = %fingerprint,
                message = "Throttle store lookup timed out, not throttling"
            );
            ThrottleDecision::allow("throttle store timed out")
        }
    }
}
