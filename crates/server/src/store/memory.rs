//! In-process stores backed by `DashMap`.

use super::{
    AuditEntry, AuditSink, EscalationRecord, EscalationStatus, EscalationStore, ThrottleRecord,
    ThrottleStore, ThrottleUpdate,
};
use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct MemoryThrottleStore {
    records: Arc<DashMap<String, ThrottleRecord>>,
}

impl MemoryThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record directly, bypassing the merge rules.
    pub fn insert(&self, record: ThrottleRecord) {
        self.records.insert(record.fingerprint.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl ThrottleStore for MemoryThrottleStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<ThrottleRecord>, StoreError> {
        Ok(self.records.get(fingerprint).map(|r| r.value().clone()))
    }

    async fn upsert(&self, fingerprint: &str, update: ThrottleUpdate) -> Result<(), StoreError> {
        // The entry guard holds the shard lock for the whole read-modify-write.
        match self.records.entry(fingerprint.to_string()) {
            Entry::Occupied(mut occupied) => update.merge_into(occupied.get_mut()),
            Entry::Vacant(vacant) => {
                vacant.insert(update.into_new_record(fingerprint));
            }
        }
        Ok(())
    }

    async fn prune(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        let before = self.records.len();
        self.records.retain(|_, r| r.last_sent >= cutoff);
        Ok(before.saturating_sub(self.records.len()) as u64)
    }
}

#[derive(Clone, Default)]
pub struct MemoryEscalationStore {
    records: Arc<DashMap<String, EscalationRecord>>,
}

impl MemoryEscalationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl EscalationStore for MemoryEscalationStore {
    async fn put(&self, record: &EscalationRecord) -> Result<bool, StoreError> {
        match self.records.entry(record.alert_id.clone()) {
            Entry::Occupied(existing) if existing.get().status == EscalationStatus::Scheduled => {
                Ok(false)
            }
            Entry::Occupied(mut existing) => {
                existing.insert(record.clone());
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, alert_id: &str) -> Result<Option<EscalationRecord>, StoreError> {
        Ok(self.records.get(alert_id).map(|r| r.value().clone()))
    }

    async fn list_due(
        &self,
        before: OffsetDateTime,
        limit: u64,
    ) -> Result<Vec<EscalationRecord>, StoreError> {
        let mut due: Vec<EscalationRecord> = self
            .records
            .iter()
            .filter(|r| r.status == EscalationStatus::Scheduled && r.escalation_time <= before)
            .map(|r| r.value().clone())
            .collect();
        due.sort_by_key(|r| r.escalation_time);
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn transition(
        &self,
        alert_id: &str,
        from: EscalationStatus,
        to: EscalationStatus,
    ) -> Result<bool, StoreError> {
        match self.records.get_mut(alert_id) {
            Some(mut record) if record.status == from => {
                record.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryAuditSink {
    entries: Arc<RwLock<Vec<AuditEntry>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
