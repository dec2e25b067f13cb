//! Alert processing core.
//!
//! This module handles:
//! - Fingerprinting and time-windowed throttling of incoming alerts
//! - Enrichment and delivery planning
//! - Parallel fan-out to notification channels
//! - Deferred escalation and its acknowledgement
//!
//! ## Submodules
//!
//! - `model` - Alert types, severities and the submission boundary
//! - `fingerprint` - Deduplication key
//! - `throttle` - Suppression decisions with exponential backoff
//! - `enrich` - Escalation level, urgency, impact, context
//! - `planner` - Channel selection and timers
//! - `dispatch` - Per-channel delivery with timeouts
//! - `escalation` - Scheduling, firing and acknowledgement
//! - `pipeline` - `AlertProcessor`, the entry point
//! - `retention` - Pruning of idle throttle records

pub mod dispatch;
pub mod enrich;
pub mod escalation;
pub mod fingerprint;
pub mod model;
pub mod pipeline;
pub mod planner;
pub mod retention;
pub mod throttle;

// Re-export commonly used items
pub use dispatch::{ChannelOutcome, DeliveryResult, Dispatcher};
pub use enrich::{AlertContext, EnrichedAlert, Impact, Urgency, enrich};
pub use escalation::{EscalationRunner, FireSummary, escalation_loop};
pub use fingerprint::fingerprint;
pub use model::{Alert, AlertSubmission, AlertType, DetailValue, Severity};
pub use pipeline::{AlertProcessor, PipelineSettings, ProcessingResult};
pub use planner::{ChannelKind, DeliveryPlan, plan};
pub use retention::{prune_throttle_records, retention_loop};
pub use throttle::{ThrottleDecision, should_throttle};
