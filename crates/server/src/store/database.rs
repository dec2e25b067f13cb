//! sea-orm backed stores.

use super::{
    AuditEntry, AuditSink, EscalationRecord, EscalationStatus, EscalationStore, ThrottleRecord,
    ThrottleStore, ThrottleUpdate,
};
use crate::alerts::planner::ChannelKind;
use crate::entity::{alert_audit_log, escalation_record, throttle_record};
use crate::error::StoreError;
use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct SeaOrmThrottleStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmThrottleStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<throttle_record::Model> for ThrottleRecord {
    type Error = StoreError;

    fn try_from(model: throttle_record::Model) -> Result<Self, Self::Error> {
        Ok(ThrottleRecord {
            alert_type: model
                .alert_type
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            severity: model
                .severity
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("{e}")))?,
            send_count: u32::try_from(model.send_count).map_err(|_| {
                StoreError::Corrupt(format!(
                    "negative send_count {} for {}",
                    model.send_count, model.fingerprint
                ))
            })?,
            fingerprint: model.fingerprint,
            source_component: model.source_component,
            first_seen: model.first_seen,
            last_sent: model.last_sent,
            last_message: model.last_message,
        })
    }
}

#[async_trait]
impl ThrottleStore for SeaOrmThrottleStore {
    #[tracing::instrument(skip(self))]
    async fn get(&self, fingerprint: &str) -> Result<Option<ThrottleRecord>, StoreError> {
        throttle_record::Entity::find_by_id(fingerprint.to_string())
            .one(self.db.as_ref())
            .await?
            .map(ThrottleRecord::try_from)
            .transpose()
    }

    #[tracing::instrument(skip(self, update))]
    async fn upsert(&self, fingerprint: &str, update: ThrottleUpdate) -> Result<(), StoreError> {
        use throttle_record::Column;

        let model = throttle_record::ActiveModel {
            fingerprint: ActiveValue::Set(fingerprint.to_string()),
            alert_type: ActiveValue::Set(update.alert_type.to_string()),
            severity: ActiveValue::Set(update.severity.to_string()),
            source_component: ActiveValue::Set(update.source_component),
            send_count: ActiveValue::Set(1),
            first_seen: ActiveValue::Set(update.at),
            last_sent: ActiveValue::Set(update.at),
            last_message: ActiveValue::Set(update.message),
        };

        // The increment runs inside the database so concurrent writers both count.
        // first_seen is not in the update list and keeps its original value.
        let on_conflict = OnConflict::column(Column::Fingerprint)
            .update_columns([Column::LastSent, Column::LastMessage, Column::Severity])
            .value(
                Column::SendCount,
                Expr::col((throttle_record::Entity, Column::SendCount)).add(1),
            )
            .to_owned();

        throttle_record::Entity::insert(model)
            .on_conflict(on_conflict)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn prune(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        let res = throttle_record::Entity::delete_many()
            .filter(throttle_record::Column::LastSent.lt(cutoff))
            .exec(self.db.as_ref())
            .await?;
        Ok(res.rows_affected)
    }
}

#[derive(Clone)]
pub struct SeaOrmEscalationStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmEscalationStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<escalation_record::Model> for EscalationRecord {
    type Error = StoreError;

    fn try_from(model: escalation_record::Model) -> Result<Self, Self::Error> {
        let escalation_channels: Vec<ChannelKind> =
            serde_json::from_str(&model.escalation_channels)?;
        Ok(EscalationRecord {
            status: model.status.parse()?,
            alert: serde_json::from_str(&model.alert_payload)?,
            alert_id: model.alert_id,
            escalation_time: model.escalation_time,
            escalation_channels,
            created_at: model.created_at,
        })
    }
}

#[async_trait]
impl EscalationStore for SeaOrmEscalationStore {
    #[tracing::instrument(skip(self, record), fields(alert_id = %record.alert_id))]
    async fn put(&self, record: &EscalationRecord) -> Result<bool, StoreError> {
        use escalation_record::Column;

        let model = escalation_record::ActiveModel {
            alert_id: ActiveValue::Set(record.alert_id.clone()),
            escalation_time: ActiveValue::Set(record.escalation_time),
            escalation_channels: ActiveValue::Set(serde_json::to_string(
                &record.escalation_channels,
            )?),
            status: ActiveValue::Set(record.status.to_string()),
            created_at: ActiveValue::Set(record.created_at),
            alert_payload: ActiveValue::Set(serde_json::to_string(&record.alert)?),
        };

        // A pending escalation keeps its deadline; only settled records are re-armed.
        let written = escalation_record::Entity::insert(model)
            .on_conflict(
                OnConflict::column(Column::AlertId)
                    .update_columns([
                        Column::EscalationTime,
                        Column::EscalationChannels,
                        Column::Status,
                        Column::CreatedAt,
                        Column::AlertPayload,
                    ])
                    .action_and_where(
                        Expr::col((escalation_record::Entity, Column::Status))
                            .ne(EscalationStatus::Scheduled.as_str()),
                    )
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(written > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn get(&self, alert_id: &str) -> Result<Option<EscalationRecord>, StoreError> {
        escalation_record::Entity::find_by_id(alert_id.to_string())
            .one(self.db.as_ref())
            .await?
            .map(EscalationRecord::try_from)
            .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn list_due(
        &self,
        before: OffsetDateTime,
        limit: u64,
    ) -> Result<Vec<EscalationRecord>, StoreError> {
        use escalation_record::Column;

        escalation_record::Entity::find()
            .filter(Column::Status.eq(EscalationStatus::Scheduled.as_str()))
            .filter(Column::EscalationTime.lte(before))
            .order_by_asc(Column::EscalationTime)
            .limit(limit)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(EscalationRecord::try_from)
            .collect()
    }

    #[tracing::instrument(skip(self))]
    async fn transition(
        &self,
        alert_id: &str,
        from: EscalationStatus,
        to: EscalationStatus,
    ) -> Result<bool, StoreError> {
        use escalation_record::Column;

        let res = escalation_record::Entity::update_many()
            .col_expr(Column::Status, Expr::value(to.as_str()))
            .filter(Column::AlertId.eq(alert_id))
            .filter(Column::Status.eq(from.as_str()))
            .exec(self.db.as_ref())
            .await?;
        Ok(res.rows_affected == 1)
    }
}

#[derive(Clone)]
pub struct SeaOrmAuditSink {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmAuditSink {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuditSink for SeaOrmAuditSink {
    #[tracing::instrument(skip(self, entry), fields(alert_id = %entry.alert_id, status = %entry.delivery_status))]
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        let model = alert_audit_log::ActiveModel {
            id: ActiveValue::NotSet,
            alert_type: ActiveValue::Set(entry.alert_type.to_string()),
            severity: ActiveValue::Set(entry.severity.to_string()),
            alert_id: ActiveValue::Set(entry.alert_id),
            delivery_status: ActiveValue::Set(entry.delivery_status.to_string()),
            actor: ActiveValue::Set(entry.actor),
            created_at: ActiveValue::Set(entry.recorded_at),
        };
        alert_audit_log::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }
}
