pub use sea_orm_migration::prelude::*;

mod m20251020_090000_add_throttle_record;
mod m20251020_090100_add_escalation_record;
mod m20251020_090200_add_alert_audit_log;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251020_090000_add_throttle_record::Migration),
            Box::new(m20251020_090100_add_escalation_record::Migration),
            Box::new(m20251020_090200_add_alert_audit_log::Migration),
        ]
    }
}
