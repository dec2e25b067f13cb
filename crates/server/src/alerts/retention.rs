use crate::error::StoreError;
use crate::store::ThrottleStore;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::interval;

/// Deletes throttle records whose last delivery precedes `older_than`.
#[tracing::instrument(skip(store))]
pub async fn prune_throttle_records(
    store: &dyn ThrottleStore,
    older_than: OffsetDateTime,
) -> Result<u64, StoreError> {
    let removed = store.prune(older_than).await?;
    if removed > 0 {
        tracing::info!(
            name = "alerts.retention.pruned",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            removed,
            cutoff = %older_than,
            message = "Pruned idle throttle records"
        );
    }
    Ok(removed)
}

/// Prunes records idle for more than `retention_days` every `every`.
/// Does nothing when `retention_days` is 0.
pub async fn retention_loop(store: Arc<dyn ThrottleStore>, retention_days: u32, every: Duration) {
    if retention_days == 0 {
        tracing::info!(
            name = "alerts.retention.disabled",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            message = "Throttle record pruning disabled"
        );
        return;
    }
    let mut ticker = interval(every);
    loop {
        ticker.tick().await;
        let cutoff =
            OffsetDateTime::now_utc() - time::Duration::days(i64::from(retention_days));
        if let Err(e) = prune_throttle_records(store.as_ref(), cutoff).await {
            tracing::error!(
                name = "alerts.retention.failed",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                error = %e,
                message = "Failed to prune throttle records"
            );
        }
    }
}
