//! An alert processing engine.
//!
//! Turns raw operational signals (quota breaches, dead-letter-queue spikes,
//! stuck jobs, budget overruns, system errors) into deduplicated, throttled
//! and escalated notifications.

use std::sync::Arc;

use lettre::{AsyncSmtpTransport, Tokio1Executor};
use sea_orm::DatabaseConnection;

use crate::alerts::{AlertProcessor, Dispatcher, EscalationRunner, PipelineSettings};
use crate::channels::ChannelRegistry;
use crate::config::{AppConfig, ConfigError};
use crate::store::{
    AuditSink, EscalationStore, SeaOrmAuditSink, SeaOrmEscalationStore, SeaOrmThrottleStore,
    ThrottleStore,
};

pub mod alerts;
pub mod api;
pub mod channels;
pub mod config;
pub mod email_templates;
pub mod entity;
pub mod error;
pub mod logging;
pub mod store;

#[derive(Clone, Debug)]
pub struct AppResources {
    pub db: Arc<DatabaseConnection>,
    pub mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    pub config: Arc<AppConfig>,
}

/// The long-lived pieces `main` wires together.
pub struct Services {
    pub processor: AlertProcessor,
    pub escalations: Arc<EscalationRunner>,
    pub throttle_store: Arc<dyn ThrottleStore>,
}

impl AppResources {
    /// Builds the database-backed stores, the channel registry and the
    /// processor from configuration.
    pub fn services(&self) -> Result<Services, ConfigError> {
        let pipeline = &self.config.pipeline;
        let registry = ChannelRegistry::from_config(&self.config, self.mailer.clone())?;
        let dispatcher = Dispatcher::new(
            registry,
            pipeline.channel_timeout(),
            pipeline.delivery_timeout(),
        );

        let throttle_store: Arc<dyn ThrottleStore> =
            Arc::new(SeaOrmThrottleStore::new(self.db.clone()));
        let escalation_store: Arc<dyn EscalationStore> =
            Arc::new(SeaOrmEscalationStore::new(self.db.clone()));
        let audit_sink: Arc<dyn AuditSink> = Arc::new(SeaOrmAuditSink::new(self.db.clone()));

        let processor = AlertProcessor::new(
            throttle_store.clone(),
            escalation_store.clone(),
            audit_sink,
            dispatcher.clone(),
            PipelineSettings::from(pipeline),
        );
        let escalations = Arc::new(EscalationRunner::new(
            escalation_store,
            dispatcher,
            pipeline.store_timeout(),
            self.config.escalation.batch_size,
        ));

        Ok(Services {
            processor,
            escalations,
            throttle_store,
        })
    }
}
