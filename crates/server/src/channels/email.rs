//! Email delivery for alert notifications.

use super::{NotificationChannel, NotificationPurpose};
use crate::alerts::enrich::EnrichedAlert;
use crate::config::ConfigError;
use crate::email_templates::AlertEmailTemplate;
use crate::error::ChannelError;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::fmt::Display;
use std::sync::Arc;

/// Sends every alert to a fixed list of recipients.
pub struct EmailChannel<T = AsyncSmtpTransport<Tokio1Executor>> {
    mailer: Arc<T>,
    from: Mailbox,
    recipients: Vec<Mailbox>,
}

impl<T> EmailChannel<T> {
    pub fn new(mailer: Arc<T>, from: &str, recipients: &[String]) -> Result<Self, ConfigError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| ConfigError::Validation(format!("invalid smtp.from '{from}': {e}")))?;
        let recipients = recipients
            .iter()
            .map(|r| {
                r.parse::<Mailbox>().map_err(|e| {
                    ConfigError::Validation(format!("invalid email recipient '{r}': {e}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if recipients.is_empty() {
            return Err(ConfigError::Validation(
                "email channel needs at least one recipient".into(),
            ));
        }
        Ok(Self {
            mailer,
            from,
            recipients,
        })
    }

    fn build_message(
        &self,
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
    ) -> Result<Message, ChannelError> {
        let template = AlertEmailTemplate::new(alert, purpose);
        let html = template
            .render_html()
            .map_err(|e| ChannelError::Message(format!("failed to render email: {e}")))?;

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(template.subject())
            .header(lettre::message::header::MIME_VERSION_1_0)
            .message_id(None);
        for recipient in &self.recipients {
            builder = builder.to(recipient.clone());
        }

        builder
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(template.render_text()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| ChannelError::Message(e.to_string()))
    }
}

#[async_trait]
impl<T> NotificationChannel for EmailChannel<T>
where
    T: AsyncTransport + Send + Sync,
    T::Error: Display,
{
    #[tracing::instrument(skip(self, alert), fields(alert_id = %alert.alert_id))]
    async fn send(
        &self,
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
    ) -> Result<String, ChannelError> {
        let message = self.build_message(alert, purpose)?;

        if let Err(e) = self.mailer.send(message).await {
            tracing::error!(
                name = "channels.email.send_failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                alert_id = %alert.alert_id,
                message = "Failed to send alert email"
            );
            return Err(ChannelError::Transport(e.to_string()));
        }

        Ok(format!("sent to {} recipient(s)", self.recipients.len()))
    }
}
