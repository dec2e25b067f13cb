mod common;

use alert_engine::alerts::{
    Alert, AlertProcessor, AlertType, ChannelKind, DeliveryPlan, Severity, enrich, plan,
    prune_throttle_records,
};
use alert_engine::entity::{alert_audit_log, throttle_record};
use alert_engine::error::StoreError;
use alert_engine::store::{
    AuditEntry, AuditSink, DeliveryStatus, EscalationRecord, EscalationStatus, EscalationStore,
    SeaOrmAuditSink, SeaOrmEscalationStore, SeaOrmThrottleStore, ThrottleStore, ThrottleUpdate,
};
use common::{Behaviour, dispatcher, registry_with, settings};
use futures::future::join_all;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveValue, Database, DatabaseConnection, EntityTrait, PaginatorTrait};
use std::sync::Arc;
use time::macros::datetime;

async fn setup_test_db() -> Arc<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    Arc::new(db)
}

fn update(message: &str, at: time::OffsetDateTime) -> ThrottleUpdate {
    ThrottleUpdate {
        alert_type: AlertType::StuckJobs,
        severity: Severity::Error,
        source_component: "scheduler".into(),
        message: message.into(),
        at,
    }
}

#[tokio::test]
async fn throttle_upsert_merges_and_keeps_first_seen() {
    let store = SeaOrmThrottleStore::new(setup_test_db().await);
    assert!(store.get("abcdefabcdef").await.unwrap().is_none());

    let t0 = datetime!(2025-03-01 10:00 UTC);
    let t1 = datetime!(2025-03-01 10:07 UTC);
    store.upsert("abcdefabcdef", update("first", t0)).await.unwrap();
    store.upsert("abcdefabcdef", update("second", t1)).await.unwrap();

    let record = store.get("abcdefabcdef").await.unwrap().unwrap();
    assert_eq!(record.send_count, 2);
    assert_eq!(record.first_seen, t0);
    assert_eq!(record.last_sent, t1);
    assert_eq!(record.last_message, "second");
    assert_eq!(record.alert_type, AlertType::StuckJobs);
    assert_eq!(record.severity, Severity::Error);
}

#[tokio::test]
async fn concurrent_upserts_are_not_lost() {
    let store = SeaOrmThrottleStore::new(setup_test_db().await);
    let at = datetime!(2025-03-01 10:00 UTC);

    let writes = (0..10).map(|i| store.upsert("0123456789ab", update(&format!("m{i}"), at)));
    for result in join_all(writes).await {
        result.unwrap();
    }
    assert_eq!(store.get("0123456789ab").await.unwrap().unwrap().send_count, 10);
}

#[tokio::test]
async fn prune_removes_only_idle_records() {
    let store = SeaOrmThrottleStore::new(setup_test_db().await);
    store
        .upsert("old000000000", update("old", datetime!(2025-01-01 00:00 UTC)))
        .await
        .unwrap();
    store
        .upsert("new000000000", update("new", datetime!(2025-03-01 00:00 UTC)))
        .await
        .unwrap();

    let removed = prune_throttle_records(&store, datetime!(2025-02-01 00:00 UTC))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert!(store.get("old000000000").await.unwrap().is_none());
    assert!(store.get("new000000000").await.unwrap().is_some());
}

#[tokio::test]
async fn negative_send_count_is_reported_as_corrupt() {
    let db = setup_test_db().await;
    let at = datetime!(2025-01-01 00:00 UTC);
    throttle_record::Entity::insert(throttle_record::ActiveModel {
        fingerprint: ActiveValue::Set("badbadbadbad".into()),
        alert_type: ActiveValue::Set("stuck_jobs".into()),
        severity: ActiveValue::Set("error".into()),
        source_component: ActiveValue::Set("scheduler".into()),
        send_count: ActiveValue::Set(-3),
        first_seen: ActiveValue::Set(at),
        last_sent: ActiveValue::Set(at),
        last_message: ActiveValue::Set("m".into()),
    })
    .exec_without_returning(db.as_ref())
    .await
    .unwrap();

    let store = SeaOrmThrottleStore::new(db);
    let err = store.get("badbadbadbad").await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt(_)), "{err}");
}

fn escalation(alert_id_source: &str, due: time::OffsetDateTime) -> EscalationRecord {
    let alert = Alert::new(AlertType::SystemError, Severity::Critical, "crash loop", alert_id_source)
        .with_detail("component", "transcoder")
        .with_detail("error_count", 42);
    let enriched = enrich(&alert, &format!("{alert_id_source:0>12}"), datetime!(2025-03-01 09:00 UTC));
    let p: DeliveryPlan = plan(&enriched);
    EscalationRecord {
        alert_id: enriched.alert_id.clone(),
        escalation_time: due,
        escalation_channels: p.escalation_channels,
        status: EscalationStatus::Scheduled,
        created_at: datetime!(2025-03-01 09:00 UTC),
        alert: enriched,
    }
}

#[tokio::test]
async fn escalation_records_round_trip_and_list_in_order() {
    let store = SeaOrmEscalationStore::new(setup_test_db().await);
    let late = escalation("b", datetime!(2025-03-01 09:30 UTC));
    let early = escalation("a", datetime!(2025-03-01 09:15 UTC));
    let future = escalation("c", datetime!(2025-03-01 12:00 UTC));
    for r in [&late, &early, &future] {
        store.put(r).await.unwrap();
    }

    let fetched = store.get(&early.alert_id).await.unwrap().unwrap();
    assert_eq!(fetched, early);
    assert_eq!(
        fetched.escalation_channels,
        vec![ChannelKind::Paging, ChannelKind::Phone]
    );

    let due = store
        .list_due(datetime!(2025-03-01 10:00 UTC), 10)
        .await
        .unwrap();
    let ids: Vec<&str> = due.iter().map(|r| r.alert_id.as_str()).collect();
    assert_eq!(ids, vec![early.alert_id.as_str(), late.alert_id.as_str()]);

    let limited = store
        .list_due(datetime!(2025-03-01 10:00 UTC), 1)
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
}

#[tokio::test]
async fn escalation_transition_is_compare_and_swap() {
    let store = SeaOrmEscalationStore::new(setup_test_db().await);
    let record = escalation("a", datetime!(2025-03-01 09:15 UTC));
    store.put(&record).await.unwrap();

    let won = store
        .transition(&record.alert_id, EscalationStatus::Scheduled, EscalationStatus::Fired)
        .await
        .unwrap();
    let lost = store
        .transition(&record.alert_id, EscalationStatus::Scheduled, EscalationStatus::Cancelled)
        .await
        .unwrap();
    assert!(won);
    assert!(!lost);
    assert_eq!(
        store.get(&record.alert_id).await.unwrap().unwrap().status,
        EscalationStatus::Fired
    );
    assert!(
        store
            .list_due(datetime!(2025-03-01 10:00 UTC), 10)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn pending_escalation_keeps_deadline_until_settled() {
    let store = SeaOrmEscalationStore::new(setup_test_db().await);
    let first = escalation("a", datetime!(2025-03-01 09:15 UTC));
    let repeat = escalation("a", datetime!(2025-03-01 09:18 UTC));

    assert!(store.put(&first).await.unwrap());
    assert!(!store.put(&repeat).await.unwrap());
    assert_eq!(
        store.get(&first.alert_id).await.unwrap().unwrap().escalation_time,
        datetime!(2025-03-01 09:15 UTC)
    );

    store
        .transition(&first.alert_id, EscalationStatus::Scheduled, EscalationStatus::Fired)
        .await
        .unwrap();
    assert!(store.put(&repeat).await.unwrap());
    let rearmed = store.get(&first.alert_id).await.unwrap().unwrap();
    assert_eq!(rearmed.status, EscalationStatus::Scheduled);
    assert_eq!(rearmed.escalation_time, datetime!(2025-03-01 09:18 UTC));
}

#[tokio::test]
async fn audit_sink_appends_rows() {
    let db = setup_test_db().await;
    let sink = SeaOrmAuditSink::new(db.clone());
    for status in [DeliveryStatus::Delivered, DeliveryStatus::Throttled] {
        sink.record(AuditEntry {
            alert_type: AlertType::CostBudget,
            severity: Severity::Warning,
            alert_id: "feedfeedfeed".into(),
            delivery_status: status,
            actor: "alert-engine".into(),
            recorded_at: datetime!(2025-03-01 09:00 UTC),
        })
        .await
        .unwrap();
    }

    let rows = alert_audit_log::Entity::find().all(db.as_ref()).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].delivery_status, "delivered");
    assert_eq!(rows[1].delivery_status, "throttled");
    assert_eq!(rows[0].alert_type, "cost_budget");
}

#[tokio::test]
async fn pipeline_throttles_against_database_state() {
    let db = setup_test_db().await;
    let (registry, _) = registry_with(&[(ChannelKind::Messaging, Behaviour::Succeed)]);
    let processor = AlertProcessor::new(
        Arc::new(SeaOrmThrottleStore::new(db.clone())),
        Arc::new(SeaOrmEscalationStore::new(db.clone())),
        Arc::new(SeaOrmAuditSink::new(db.clone())),
        dispatcher(registry),
        settings(),
    );
    let alert = Alert::new(AlertType::StuckJobs, Severity::Warning, "3 jobs stuck", "scheduler")
        .with_detail("job_type", "transcode");

    assert_eq!(processor.process_alert(alert.clone()).await.status(), "processed");
    assert_eq!(processor.process_alert(alert).await.status(), "throttled");

    let audit_rows = alert_audit_log::Entity::find().count(db.as_ref()).await.unwrap();
    assert_eq!(audit_rows, 2);
}
