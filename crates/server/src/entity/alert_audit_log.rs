//! Append-only record of every alert outcome, for compliance and analytics.

use sea_orm::entity::prelude::*;
use serde::Serialize;
use time::OffsetDateTime;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "alert_audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub alert_type: String,
    pub severity: String,
    pub alert_id: String,
    pub delivery_status: String, // "delivered", "throttled", "failed"
    pub actor: String,
    pub created_at: OffsetDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
