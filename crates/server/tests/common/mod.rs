#![allow(dead_code)]

use alert_engine::alerts::{AlertProcessor, ChannelKind, Dispatcher, EnrichedAlert, PipelineSettings};
use alert_engine::channels::{ChannelRegistry, NotificationChannel, NotificationPurpose};
use alert_engine::error::{ChannelError, StoreError};
use alert_engine::store::{
    AuditEntry, AuditSink, EscalationRecord, EscalationStatus, EscalationStore,
    MemoryAuditSink, MemoryEscalationStore, MemoryThrottleStore, ThrottleRecord, ThrottleStore,
    ThrottleUpdate,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behaviour {
    Succeed,
    Fail,
    Hang,
}

/// A channel that records what it was asked to send.
pub struct RecordingChannel {
    kind: ChannelKind,
    behaviour: Behaviour,
    calls: Mutex<Vec<(String, NotificationPurpose)>>,
}

impl RecordingChannel {
    pub fn new(kind: ChannelKind, behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            kind,
            behaviour,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, NotificationPurpose)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(
        &self,
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
    ) -> Result<String, ChannelError> {
        self.calls
            .lock()
            .unwrap()
            .push((alert.alert_id.clone(), purpose));
        match self.behaviour {
            Behaviour::Succeed => Ok(format!("{} ok", self.kind)),
            Behaviour::Fail => Err(ChannelError::Transport("connection refused".into())),
            Behaviour::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok("too late".into())
            }
        }
    }
}

/// Registers one recording channel per kind with the given behaviour.
pub fn registry_with(
    channels: &[(ChannelKind, Behaviour)],
) -> (ChannelRegistry, Vec<Arc<RecordingChannel>>) {
    let mut registry = ChannelRegistry::new();
    let mut handles = Vec::new();
    for &(kind, behaviour) in channels {
        let channel = RecordingChannel::new(kind, behaviour);
        registry.register(kind, channel.clone());
        handles.push(channel);
    }
    (registry, handles)
}

/// Every channel kind, all succeeding.
pub fn healthy_registry() -> (ChannelRegistry, Vec<Arc<RecordingChannel>>) {
    let all: Vec<(ChannelKind, Behaviour)> = ChannelKind::ALL
        .iter()
        .map(|&k| (k, Behaviour::Succeed))
        .collect();
    registry_with(&all)
}

pub fn dispatcher(registry: ChannelRegistry) -> Dispatcher {
    Dispatcher::new(registry, Duration::from_millis(200), Duration::from_secs(1))
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        store_timeout: Duration::from_millis(500),
        actor: "test-suite".into(),
    }
}

pub struct Harness {
    pub processor: AlertProcessor,
    pub throttle: MemoryThrottleStore,
    pub escalations: MemoryEscalationStore,
    pub audit: MemoryAuditSink,
}

pub fn harness(registry: ChannelRegistry) -> Harness {
    let throttle = MemoryThrottleStore::new();
    let escalations = MemoryEscalationStore::new();
    let audit = MemoryAuditSink::new();
    let processor = AlertProcessor::new(
        Arc::new(throttle.clone()),
        Arc::new(escalations.clone()),
        Arc::new(audit.clone()),
        dispatcher(registry),
        settings(),
    );
    Harness {
        processor,
        throttle,
        escalations,
        audit,
    }
}

/// A store that is always down.
#[derive(Clone, Default)]
pub struct UnavailableStore;

#[async_trait]
impl ThrottleStore for UnavailableStore {
    async fn get(&self, _fingerprint: &str) -> Result<Option<ThrottleRecord>, StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
    async fn upsert(&self, _fingerprint: &str, _update: ThrottleUpdate) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
    async fn prune(&self, _cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
}

#[async_trait]
impl EscalationStore for UnavailableStore {
    async fn put(&self, _record: &EscalationRecord) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
    async fn get(&self, _alert_id: &str) -> Result<Option<EscalationRecord>, StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
    async fn list_due(
        &self,
        _before: OffsetDateTime,
        _limit: u64,
    ) -> Result<Vec<EscalationRecord>, StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
    async fn transition(
        &self,
        _alert_id: &str,
        _from: EscalationStatus,
        _to: EscalationStatus,
    ) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
}

#[async_trait]
impl AuditSink for UnavailableStore {
    async fn record(&self, _entry: AuditEntry) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection reset".into()))
    }
}
