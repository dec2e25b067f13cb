use goose::prelude::*;
use serde_json::json;
use std::env;

/// Number of distinct source components to spread submissions over. Each one
/// is its own fingerprint, so a higher value means fewer throttled responses.
fn source_spread() -> u64 {
    env::var("SOURCE_SPREAD")
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(50)
}

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/healthz").await?;
    Ok(())
}

async fn submit_warning(user: &mut GooseUser) -> TransactionResult {
    let source = user.weighted_users_index as u64 % source_spread();
    let body = json!({
        "alert_type": "dlq_spike",
        "severity": "warning",
        "message": "Dead letter queue growing",
        "details": {"queue_name": "ingest", "message_count": 250},
        "source_component": format!("loadtest_{source}")
    });
    let _goose_metrics = user.post_json("/api/alerts", &body).await?;
    Ok(())
}

async fn submit_critical(user: &mut GooseUser) -> TransactionResult {
    let body = json!({
        "alert_type": "quota_threshold",
        "severity": "critical",
        "message": "Quota nearly exhausted",
        "details": {"service": "youtube", "utilization_percent": 97},
        "source_component": "loadtest_quota"
    });
    let _goose_metrics = user.post_json("/api/alerts", &body).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    println!("Spreading alert submissions over {} sources", source_spread());

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("HealthCheck").register_transaction(transaction!(health_check)),
        )
        .register_scenario(
            scenario!("AlertIntake")
                .register_transaction(transaction!(submit_warning).set_weight(9)?)
                .register_transaction(transaction!(submit_critical)),
        )
        .execute()
        .await?;

    Ok(())
}
