//! Persistence seams used by the alert pipeline.
//!
//! Every store is a trait so the pipeline can run against the database-backed
//! implementations in [`database`] or the in-process ones in [`memory`].

use crate::alerts::enrich::EnrichedAlert;
use crate::alerts::model::{AlertType, Severity};
use crate::alerts::planner::ChannelKind;
use crate::error::StoreError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use utoipa::ToSchema;

pub mod database;
pub mod memory;

pub use database::{SeaOrmAuditSink, SeaOrmEscalationStore, SeaOrmThrottleStore};
pub use memory::{MemoryAuditSink, MemoryEscalationStore, MemoryThrottleStore};

/// Per-fingerprint delivery history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThrottleRecord {
    pub fingerprint: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub source_component: String,
    pub send_count: u32,
    #[serde(with = "time::serde::rfc3339")]
    pub first_seen: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub last_sent: OffsetDateTime,
    pub last_message: String,
}

/// One delivered (or attempted) occurrence to merge into a [`ThrottleRecord`].
#[derive(Clone, Debug, PartialEq)]
pub struct ThrottleUpdate {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub source_component: String,
    pub message: String,
    pub at: OffsetDateTime,
}

impl ThrottleUpdate {
    /// The record a first occurrence creates.
    pub fn into_new_record(self, fingerprint: &str) -> ThrottleRecord {
        ThrottleRecord {
            fingerprint: fingerprint.to_string(),
            alert_type: self.alert_type,
            severity: self.severity,
            source_component: self.source_component,
            send_count: 1,
            first_seen: self.at,
            last_sent: self.at,
            last_message: self.message,
        }
    }

    /// Merges into an existing record: bumps the count, keeps `first_seen`.
    pub fn merge_into(self, record: &mut ThrottleRecord) {
        record.send_count = record.send_count.saturating_add(1);
        record.last_sent = self.at;
        record.last_message = self.message;
        record.severity = self.severity;
    }
}

#[async_trait]
pub trait ThrottleStore: Send + Sync {
    async fn get(&self, fingerprint: &str) -> Result<Option<ThrottleRecord>, StoreError>;

    /// Creates or merges the record for `fingerprint` in a single write.
    ///
    /// Concurrent upserts for the same fingerprint must each count.
    async fn upsert(&self, fingerprint: &str, update: ThrottleUpdate) -> Result<(), StoreError>;

    /// Deletes records whose `last_sent` precedes `cutoff`. Returns the number removed.
    async fn prune(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    Scheduled,
    Fired,
    Cancelled,
}

impl EscalationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationStatus::Scheduled => "scheduled",
            EscalationStatus::Fired => "fired",
            EscalationStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EscalationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EscalationStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EscalationStatus::Scheduled),
            "fired" => Ok(EscalationStatus::Fired),
            "cancelled" => Ok(EscalationStatus::Cancelled),
            other => Err(StoreError::Corrupt(format!(
                "unknown escalation status '{other}'"
            ))),
        }
    }
}

/// A deferred escalation for one alert.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscalationRecord {
    pub alert_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub escalation_time: OffsetDateTime,
    pub escalation_channels: Vec<ChannelKind>,
    pub status: EscalationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Snapshot delivered when the escalation fires.
    pub alert: EnrichedAlert,
}

#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Stores `record` unless the alert already has a `scheduled` record, in
    /// which case the pending deadline is kept. `fired` and `cancelled`
    /// records are replaced. Returns `true` when `record` was written.
    async fn put(&self, record: &EscalationRecord) -> Result<bool, StoreError>;

    async fn get(&self, alert_id: &str) -> Result<Option<EscalationRecord>, StoreError>;

    /// Scheduled records with `escalation_time <= before`, oldest first.
    async fn list_due(
        &self,
        before: OffsetDateTime,
        limit: u64,
    ) -> Result<Vec<EscalationRecord>, StoreError>;

    /// Compare-and-swap on the status. Returns `true` only for the caller that
    /// moved the record from `from` to `to`.
    async fn transition(
        &self,
        alert_id: &str,
        from: EscalationStatus,
        to: EscalationStatus,
    ) -> Result<bool, StoreError>;
}

/// Terminal outcome of one processed alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Throttled,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Throttled => "throttled",
            DeliveryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuditEntry {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub alert_id: String,
    pub delivery_status: DeliveryStatus,
    pub actor: String,
    pub recorded_at: OffsetDateTime,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;
}
