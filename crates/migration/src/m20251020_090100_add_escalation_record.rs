use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EscalationRecord::Table)
                    .if_not_exists()
                    .col(string(EscalationRecord::AlertId).primary_key())
                    .col(timestamp_with_time_zone(EscalationRecord::EscalationTime))
                    .col(
                        ColumnDef::new(EscalationRecord::EscalationChannels)
                            .text()
                            .not_null()
                            .comment("JSON array of channel names"),
                    )
                    .col(
                        ColumnDef::new(EscalationRecord::Status)
                            .string()
                            .not_null()
                            .comment("'scheduled', 'fired' or 'cancelled'"),
                    )
                    .col(
                        timestamp_with_time_zone(EscalationRecord::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(text(EscalationRecord::AlertPayload))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_escalation_record_status_time")
                    .table(EscalationRecord::Table)
                    .col(EscalationRecord::Status)
                    .col(EscalationRecord::EscalationTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_escalation_record_status_time")
                    .table(EscalationRecord::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(EscalationRecord::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum EscalationRecord {
    Table,
    AlertId,
    EscalationTime,
    EscalationChannels,
    Status,
    CreatedAt,
    AlertPayload,
}
