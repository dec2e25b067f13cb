//! Maps an enriched alert to the channels and timers used to deliver it.

use crate::alerts::enrich::{EnrichedAlert, Urgency};
use crate::alerts::model::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Minimum auto-escalation delay once halved for immediate urgency.
pub const MIN_AUTO_ESCALATION_MINUTES: u32 = 5;
/// Batching hint for informational alerts.
pub const INFO_DELIVERY_DELAY_MINUTES: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Messaging,
    Email,
    Paging,
    Phone,
    MessagingOncall,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Messaging,
        ChannelKind::Email,
        ChannelKind::Paging,
        ChannelKind::Phone,
        ChannelKind::MessagingOncall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Messaging => "messaging",
            ChannelKind::Email => "email",
            ChannelKind::Paging => "paging",
            ChannelKind::Phone => "phone",
            ChannelKind::MessagingOncall => "messaging_oncall",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryPlan {
    pub primary_channels: Vec<ChannelKind>,
    pub escalation_channels: Vec<ChannelKind>,
    pub delivery_delay_minutes: u32,
    pub requires_acknowledgment: bool,
    pub auto_escalation_minutes: Option<u32>,
}

pub fn plan(alert: &EnrichedAlert) -> DeliveryPlan {
    let severity = alert.severity();
    let mut plan = DeliveryPlan::default();

    match severity {
        Severity::Critical | Severity::Error => {
            plan.primary_channels = vec![ChannelKind::Messaging, ChannelKind::Email];
            plan.requires_acknowledgment = true;
            plan.auto_escalation_minutes = Some(if severity == Severity::Critical { 15 } else { 30 });
        }
        Severity::Warning => {
            plan.primary_channels = vec![ChannelKind::Messaging];
            plan.auto_escalation_minutes = Some(60);
        }
        Severity::Info => {
            plan.primary_channels = vec![ChannelKind::Messaging];
            plan.delivery_delay_minutes = INFO_DELIVERY_DELAY_MINUTES;
        }
    }

    plan.escalation_channels = match alert.escalation_level {
        0 => Vec::new(),
        1 => vec![ChannelKind::Email, ChannelKind::MessagingOncall],
        _ => vec![ChannelKind::Paging, ChannelKind::Phone],
    };

    if alert.urgency == Urgency::Immediate {
        plan.delivery_delay_minutes = 0;
        // The critical timers already assume immediate urgency; only urgency
        // raised above the severity's own level shortens them further.
        if Urgency::for_severity(severity) != Urgency::Immediate {
            plan.auto_escalation_minutes = plan
                .auto_escalation_minutes
                .map(|m| (m / 2).max(MIN_AUTO_ESCALATION_MINUTES));
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::enrich::enrich;
    use crate::alerts::model::{Alert, AlertType};
    use time::macros::datetime;

    fn planned(alert: Alert) -> DeliveryPlan {
        plan(&enrich(&alert, "fp", datetime!(2025-01-01 00:00 UTC)))
    }

    #[test]
    fn critical_goes_to_messaging_and_email_with_paging_escalation() {
        let p = planned(Alert::new(AlertType::QuotaThreshold, Severity::Critical, "m", "s"));
        assert_eq!(p.primary_channels, vec![ChannelKind::Messaging, ChannelKind::Email]);
        assert_eq!(p.escalation_channels, vec![ChannelKind::Paging, ChannelKind::Phone]);
        assert!(p.requires_acknowledgment);
        assert_eq!(p.auto_escalation_minutes, Some(15));
        assert_eq!(p.delivery_delay_minutes, 0);
    }

    #[test]
    fn error_with_level_one_escalates_to_oncall() {
        let p = planned(Alert::new(AlertType::SystemError, Severity::Error, "m", "s"));
        assert_eq!(p.primary_channels, vec![ChannelKind::Messaging, ChannelKind::Email]);
        assert_eq!(
            p.escalation_channels,
            vec![ChannelKind::Email, ChannelKind::MessagingOncall]
        );
        assert_eq!(p.auto_escalation_minutes, Some(30));
    }

    #[test]
    fn warning_is_messaging_only() {
        let p = planned(Alert::new(AlertType::DlqSpike, Severity::Warning, "m", "s"));
        assert_eq!(p.primary_channels, vec![ChannelKind::Messaging]);
        assert!(p.escalation_channels.is_empty());
        assert!(!p.requires_acknowledgment);
        assert_eq!(p.auto_escalation_minutes, Some(60));
    }

    #[test]
    fn info_is_batched_without_escalation() {
        let p = planned(Alert::new(AlertType::PerformanceDegradation, Severity::Info, "m", "s"));
        assert_eq!(p.primary_channels, vec![ChannelKind::Messaging]);
        assert_eq!(p.delivery_delay_minutes, 5);
        assert!(p.escalation_channels.is_empty());
        assert_eq!(p.auto_escalation_minutes, None);
    }

    #[test]
    fn override_makes_delivery_immediate_and_halves_timer() {
        let p = planned(
            Alert::new(AlertType::DlqSpike, Severity::Warning, "m", "s").with_override(true),
        );
        assert_eq!(p.delivery_delay_minutes, 0);
        assert_eq!(p.auto_escalation_minutes, Some(30));
        assert_eq!(
            p.escalation_channels,
            vec![ChannelKind::Email, ChannelKind::MessagingOncall]
        );

        let info = planned(
            Alert::new(AlertType::DlqSpike, Severity::Info, "m", "s").with_override(true),
        );
        assert_eq!(info.delivery_delay_minutes, 0);
        assert_eq!(info.auto_escalation_minutes, None);
    }
}
