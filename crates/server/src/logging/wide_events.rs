use std::fmt::Display;

/// One wide event per processed alert.
///
/// The span is created with every attribute the pipeline may fill in declared
/// up front as `Empty`; `tracing` silently drops `record` calls for fields a
/// span was not created with. Attributes are recorded as they become known
/// and the event is emitted once, when the outcome is final.
///
/// ```rust,ignore
/// let evt = AlertWideEvent::new();
/// evt.add("fingerprint", &fingerprint);
/// evt.add("outcome", "throttled");
/// evt.info("alert processed");
/// ```
use tracing::{Level, Span, field};

/// Attribute names an [`AlertWideEvent`] accepts.
pub const FIELDS: &[&str] = &[
    "fingerprint",
    "alert_type",
    "severity",
    "source_component",
    "override_throttling",
    "outcome",
    "throttle_reason",
    "escalation_level",
    "channels_planned",
    "channels_succeeded",
    "channels_failed",
    "escalation_scheduled",
    "escalation_time",
    "duration_ms",
];

#[derive(Clone)]
pub struct AlertWideEvent {
    span: Span,
}

impl Default for AlertWideEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertWideEvent {
    pub fn new() -> Self {
        let span = tracing::span!(
            target: concat!(env!("CARGO_PKG_NAME"), "::alerts"),
            Level::INFO,
            "alert_event",
            event.name = "alerts.process",
            fingerprint = field::Empty,
            alert_type = field::Empty,
            severity = field::Empty,
            source_component = field::Empty,
            override_throttling = field::Empty,
            outcome = field::Empty,
            throttle_reason = field::Empty,
            escalation_level = field::Empty,
            channels_planned = field::Empty,
            channels_succeeded = field::Empty,
            channels_failed = field::Empty,
            escalation_scheduled = field::Empty,
            escalation_time = field::Empty,
            duration_ms = field::Empty,
        );
        AlertWideEvent { span }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Records `key` on the span. Keys outside [`FIELDS`] are ignored.
    pub fn add<V: Display>(&self, key: &'static str, value: V) {
        self.span.record(key, field::display(value));
    }

    pub fn add_opt<V: Display>(&self, key: &'static str, value: Option<V>) {
        if let Some(v) = value {
            self.add(key, v);
        }
    }

    /// Records a list as a comma separated attribute.
    pub fn add_list<V: Display>(&self, key: &'static str, values: &[V]) {
        let joined = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.span.record(key, field::display(joined));
    }

    pub fn emit(&self, message: &str, level: Level) {
        self.span.in_scope(|| match level {
            Level::ERROR => tracing::event!(Level::ERROR, message = %message),
            Level::WARN => tracing::event!(Level::WARN, message = %message),
            Level::INFO => tracing::event!(Level::INFO, message = %message),
            Level::DEBUG => tracing::event!(Level::DEBUG, message = %message),
            Level::TRACE => tracing::event!(Level::TRACE, message = %message),
        });
    }

    pub fn info(&self, message: &str) {
        self.emit(message, Level::INFO)
    }
    pub fn warn(&self, message: &str) {
        self.emit(message, Level::WARN)
    }
}
