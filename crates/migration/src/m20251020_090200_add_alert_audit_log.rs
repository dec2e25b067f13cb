use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Append-only outcome log: one row per processed or throttled occurrence
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AlertAuditLog::Table)
                    .if_not_exists()
                    .col(pk_auto(AlertAuditLog::Id))
                    .col(string(AlertAuditLog::AlertType))
                    .col(string(AlertAuditLog::Severity))
                    .col(string(AlertAuditLog::AlertId))
                    .col(
                        ColumnDef::new(AlertAuditLog::DeliveryStatus)
                            .string()
                            .not_null()
                            .comment("'delivered', 'throttled' or 'failed'"),
                    )
                    .col(string(AlertAuditLog::Actor))
                    .col(
                        timestamp_with_time_zone(AlertAuditLog::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_alert_audit_log_alert_id")
                    .table(AlertAuditLog::Table)
                    .col(AlertAuditLog::AlertId)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_alert_audit_log_created_at")
                    .table(AlertAuditLog::Table)
                    .col(AlertAuditLog::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AlertAuditLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AlertAuditLog {
    Table,
    Id,
    AlertType,
    Severity,
    AlertId,
    DeliveryStatus,
    Actor,
    CreatedAt,
}
