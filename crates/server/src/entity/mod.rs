//! sea-orm entities for the alert engine tables.

pub mod alert_audit_log;
pub mod escalation_record;
pub mod throttle_record;
