//! Plain-text and HTML bodies for alert emails.

use crate::alerts::enrich::EnrichedAlert;
use crate::channels::NotificationPurpose;
use askama::Template;

/// HTML body. Askama escapes every interpolated value.
#[derive(Template)]
#[template(path = "alert_email.html")]
struct AlertEmailHtml<'a> {
    title: String,
    escalated: bool,
    message: &'a str,
    alert_id: &'a str,
    urgency: &'static str,
    impact: &'static str,
    context: Vec<(&'static str, String)>,
    actions: &'a [String],
}

pub struct AlertEmailTemplate<'a> {
    pub alert: &'a EnrichedAlert,
    pub purpose: NotificationPurpose,
}

impl<'a> AlertEmailTemplate<'a> {
    pub fn new(alert: &'a EnrichedAlert, purpose: NotificationPurpose) -> Self {
        Self { alert, purpose }
    }

    pub fn subject(&self) -> String {
        let prefix = match self.purpose {
            NotificationPurpose::Initial => "",
            NotificationPurpose::Escalation => "ESCALATED ",
        };
        format!(
            "{prefix}[{}] {} from {}",
            self.alert.severity().as_str().to_uppercase(),
            self.alert.alert_type(),
            self.alert.alert.source_component
        )
    }

    #[tracing::instrument(skip(self), fields(alert_id = %self.alert.alert_id))]
    pub fn render_text(&self) -> String {
        let a = self.alert;
        let context = a
            .context
            .fields()
            .into_iter()
            .map(|(k, v)| format!("  {k}: {v}\n"))
            .collect::<String>();
        let actions = a
            .recommended_actions
            .iter()
            .enumerate()
            .map(|(i, action)| format!("  {}. {action}\n", i + 1))
            .collect::<String>();
        let escalation_note = match self.purpose {
            NotificationPurpose::Initial => String::new(),
            NotificationPurpose::Escalation => {
                "\nThis alert was not acknowledged in time and has been escalated.\n".to_string()
            }
        };

        format!(
            r#"{}
{escalation_note}
Alert ID: {}
Urgency: {}
Impact: {}

Context:
{context}
Recommended actions:
{actions}
Acknowledge this alert to stop further escalation.
"#,
            a.alert.message,
            a.alert_id,
            a.urgency.as_str(),
            a.impact.as_str(),
        )
    }

    #[tracing::instrument(skip(self), fields(alert_id = %self.alert.alert_id))]
    pub fn render_html(&self) -> Result<String, askama::Error> {
        let a = self.alert;
        AlertEmailHtml {
            title: self.subject(),
            escalated: self.purpose == NotificationPurpose::Escalation,
            message: &a.alert.message,
            alert_id: &a.alert_id,
            urgency: a.urgency.as_str(),
            impact: a.impact.as_str(),
            context: a
                .context
                .fields()
                .into_iter()
                .map(|(k, v)| (k, v.to_string()))
                .collect(),
            actions: &a.recommended_actions,
        }
        .render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::enrich::enrich;
    use crate::alerts::model::{Alert, AlertType, Severity};
    use time::macros::datetime;

    fn enriched() -> EnrichedAlert {
        let alert = Alert::new(
            AlertType::QuotaThreshold,
            Severity::Critical,
            "Quota <almost> exhausted",
            "quota_monitor",
        )
        .with_detail("service", "youtube")
        .with_detail("utilization_percent", 95);
        enrich(&alert, "a1b2c3d4e5f6", datetime!(2025-01-01 00:00 UTC))
    }

    #[test]
    fn subject_names_severity_type_and_source() {
        let alert = enriched();
        let t = AlertEmailTemplate::new(&alert, NotificationPurpose::Initial);
        assert_eq!(t.subject(), "[CRITICAL] quota_threshold from quota_monitor");
        let t = AlertEmailTemplate::new(&alert, NotificationPurpose::Escalation);
        assert!(t.subject().starts_with("ESCALATED "));
    }

    #[test]
    fn text_lists_context_and_actions() {
        let alert = enriched();
        let text = AlertEmailTemplate::new(&alert, NotificationPurpose::Initial).render_text();
        assert!(text.contains("service: youtube"));
        assert!(text.contains("utilization_percent: 95"));
        assert!(text.contains("1. Review current API usage"));
        assert!(text.contains("a1b2c3d4e5f6"));
    }

    #[test]
    fn html_escapes_message() {
        let alert = enriched();
        let html = AlertEmailTemplate::new(&alert, NotificationPurpose::Initial)
            .render_html()
            .unwrap();
        assert!(!html.contains("<almost>"), "{html}");
        let escaped = ["Quota &lt;almost&gt; exhausted", "Quota &#60;almost&#62; exhausted"];
        assert!(escaped.iter().any(|e| html.contains(e)), "{html}");
        assert!(html.contains("<th align=\"left\">service</th><td>youtube</td>"));
        assert!(!html.contains("has been escalated"));

        let escalated = AlertEmailTemplate::new(&alert, NotificationPurpose::Escalation)
            .render_html()
            .unwrap();
        assert!(escalated.contains("has been escalated"));
    }
}
