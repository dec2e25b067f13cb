//! Notification channels.
//!
//! Each transport implements [`NotificationChannel`]; the dispatcher only sees
//! the trait and the [`ChannelRegistry`] that maps a [`ChannelKind`] to it.
//!
//! ## Submodules
//!
//! - `email` - SMTP delivery through lettre
//! - `webhook` - JSON webhooks for messaging, paging and phone bridges

pub mod email;
pub mod webhook;

use crate::alerts::enrich::EnrichedAlert;
use crate::alerts::planner::ChannelKind;
use crate::config::{AppConfig, ConfigError};
use crate::error::ChannelError;
use async_trait::async_trait;
use lettre::{AsyncSmtpTransport, Tokio1Executor};
use std::collections::HashMap;
use std::sync::Arc;

pub use email::EmailChannel;
pub use webhook::WebhookChannel;

/// Why a notification is being sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotificationPurpose {
    Initial,
    Escalation,
}

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers `alert`. The returned string is a short delivery detail
    /// (message id, HTTP status, recipient count).
    async fn send(
        &self,
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
    ) -> Result<String, ChannelError>;
}

#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ChannelKind, channel: Arc<dyn NotificationChannel>) {
        self.channels.insert(kind, channel);
    }

    pub fn get(&self, kind: ChannelKind) -> Option<Arc<dyn NotificationChannel>> {
        self.channels.get(&kind).cloned()
    }

    pub fn configured(&self) -> Vec<ChannelKind> {
        let mut kinds: Vec<ChannelKind> = self.channels.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Builds the registry from configuration. Webhook kinds without a URL
    /// stay unregistered and fail at dispatch time.
    pub fn from_config(
        config: &AppConfig,
        mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    ) -> Result<Self, ConfigError> {
        let mut registry = Self::new();

        if !config.channels.email_recipients.is_empty() {
            let email = EmailChannel::new(
                mailer,
                &config.smtp.from,
                &config.channels.email_recipients,
            )?;
            registry.register(ChannelKind::Email, Arc::new(email));
        }

        let webhooks = [
            (ChannelKind::Messaging, &config.channels.messaging_webhook_url),
            (
                ChannelKind::MessagingOncall,
                &config.channels.messaging_oncall_webhook_url,
            ),
            (ChannelKind::Paging, &config.channels.paging_webhook_url),
            (ChannelKind::Phone, &config.channels.phone_webhook_url),
        ];
        for (kind, url) in webhooks {
            if let Some(url) = url {
                let channel = WebhookChannel::new(kind, url)
                    .map_err(|e| ConfigError::Validation(format!("{kind} webhook: {e}")))?;
                registry.register(kind, Arc::new(channel));
            }
        }

        tracing::info!(
            name = "channels.registry.built",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            channels = ?registry.configured(),
            message = "Notification channels initialised"
        );
        Ok(registry)
    }
}
