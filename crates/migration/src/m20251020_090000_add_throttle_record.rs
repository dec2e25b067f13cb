use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Per-fingerprint delivery history used for throttling
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ThrottleRecord::Table)
                    .if_not_exists()
                    .col(string(ThrottleRecord::Fingerprint).primary_key())
                    .col(string(ThrottleRecord::AlertType))
                    .col(string(ThrottleRecord::Severity))
                    .col(string(ThrottleRecord::SourceComponent))
                    .col(integer(ThrottleRecord::SendCount).default(1))
                    .col(timestamp_with_time_zone(ThrottleRecord::FirstSeen))
                    .col(timestamp_with_time_zone(ThrottleRecord::LastSent))
                    .col(text(ThrottleRecord::LastMessage))
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_throttle_record_last_sent")
                    .table(ThrottleRecord::Table)
                    .col(ThrottleRecord::LastSent)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_throttle_record_last_sent")
                    .table(ThrottleRecord::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ThrottleRecord::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ThrottleRecord {
    Table,
    Fingerprint,
    AlertType,
    Severity,
    SourceComponent,
    SendCount,
    FirstSeen,
    LastSent,
    LastMessage,
}
