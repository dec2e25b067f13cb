//! Deduplication keys for alerts.
//!
//! A fingerprint covers the alert type, source, severity and the allow-listed
//! detail keys only. Free text and any other detail fields do not take part.

use crate::alerts::model::{Alert, AlertType, DetailValue, Severity};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Detail keys that identify "the same" problem.
pub const KEY_DETAIL_FIELDS: [&str; 5] = ["service", "quota_type", "error_type", "job_type", "component"];

/// Number of hex characters kept from the digest.
pub const FINGERPRINT_LEN: usize = 12;

#[derive(Serialize)]
struct CanonicalIdentity<'a> {
    alert_type: AlertType,
    source_component: &'a str,
    severity: Severity,
    key_details: BTreeMap<&'a str, &'a DetailValue>,
}

pub fn key_details(alert: &Alert) -> BTreeMap<&str, &DetailValue> {
    alert
        .details
        .iter()
        .filter(|(k, _)| KEY_DETAIL_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| (k.as_str(), v))
        .collect()
}

/// Computes the fingerprint of `alert`.
pub fn fingerprint(alert: &Alert) -> String {
    let identity = CanonicalIdentity {
        alert_type: alert.alert_type,
        source_component: &alert.source_component,
        severity: alert.severity,
        key_details: key_details(alert),
    };
    // Map keys serialize sorted; encoding plain strings and scalars cannot fail.
    let canonical = serde_json::to_vec(&identity).unwrap_or_default();
    let digest = Sha256::digest(&canonical);
    let mut hex = format!("{digest:x}");
    hex.truncate(FINGERPRINT_LEN);
    hex
}
