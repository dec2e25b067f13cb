//! JSON webhook delivery (team messaging, on-call rooms, paging and phone bridges).

use super::{NotificationChannel, NotificationPurpose};
use crate::alerts::enrich::EnrichedAlert;
use crate::alerts::planner::ChannelKind;
use crate::error::ChannelError;
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::Serialize;
use std::collections::BTreeMap;

/// Longest error body kept in a rejection.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: String,
    channel: ChannelKind,
    escalated: bool,
    alert_id: &'a str,
    alert_type: &'static str,
    severity: &'static str,
    urgency: &'static str,
    impact: &'static str,
    source_component: &'a str,
    message: &'a str,
    context: BTreeMap<&'static str, String>,
    recommended_actions: &'a [String],
}

impl<'a> WebhookPayload<'a> {
    fn new(kind: ChannelKind, alert: &'a EnrichedAlert, purpose: NotificationPurpose) -> Self {
        let escalated = purpose == NotificationPurpose::Escalation;
        let headline = format!(
            "{}[{}] {} from {}: {}",
            if escalated { "ESCALATED " } else { "" },
            alert.severity().as_str().to_uppercase(),
            alert.alert_type(),
            alert.alert.source_component,
            alert.alert.message
        );
        Self {
            text: headline,
            channel: kind,
            escalated,
            alert_id: &alert.alert_id,
            alert_type: alert.alert_type().as_str(),
            severity: alert.severity().as_str(),
            urgency: alert.urgency.as_str(),
            impact: alert.impact.as_str(),
            source_component: &alert.alert.source_component,
            message: &alert.alert.message,
            context: alert
                .context
                .fields()
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
            recommended_actions: &alert.recommended_actions,
        }
    }
}

pub struct WebhookChannel {
    kind: ChannelKind,
    url: Uri,
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl WebhookChannel {
    pub fn new(kind: ChannelKind, url: &str) -> Result<Self, ChannelError> {
        let url: Uri = url
            .parse()
            .map_err(|e| ChannelError::Transport(format!("invalid webhook url: {e}")))?;
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| ChannelError::Transport(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Ok(Self { kind, url, client })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    #[tracing::instrument(skip(self, alert), fields(channel = %self.kind, alert_id = %alert.alert_id))]
    async fn send(
        &self,
        alert: &EnrichedAlert,
        purpose: NotificationPurpose,
    ) -> Result<String, ChannelError> {
        let body = serde_json::to_vec(&WebhookPayload::new(self.kind, alert, purpose))
            .map_err(|e| ChannelError::Message(e.to_string()))?;

        let req = Request::post(self.url.clone())
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .header(
                hyper::header::USER_AGENT,
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| ChannelError::Message(e.to_string()))?;

        let res = self
            .client
            .request(req)
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))?;

        let status = res.status();
        if status.is_success() {
            return Ok(format!("HTTP {}", status.as_u16()));
        }

        let body = res
            .into_body()
            .collect()
            .await
            .map(|b| b.to_bytes())
            .unwrap_or_default();
        let mut context = String::from_utf8_lossy(&body).into_owned();
        if context.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !context.is_char_boundary(cut) {
                cut -= 1;
            }
            context.truncate(cut);
        }
        Err(ChannelError::Rejected {
            status: status.as_u16(),
            context,
        })
    }
}
