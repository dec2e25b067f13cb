//! Deferred escalations written by the scheduler and claimed by the firing task.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "escalation_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub alert_id: String,
    pub escalation_time: OffsetDateTime,
    pub escalation_channels: String, // JSON array of channel names
    pub status: String,              // "scheduled", "fired", "cancelled"
    pub created_at: OffsetDateTime,
    pub alert_payload: String, // JSON snapshot of the enriched alert
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
