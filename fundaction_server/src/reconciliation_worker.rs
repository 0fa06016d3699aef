use std::time::Duration;

use fundaction_engine::{events::EventProducers, ReconciliationApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reconciliation_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    interval: Duration,
    grace: chrono::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let api = ReconciliationApi::new(db, producers);
        info!("🩹️ Reconciliation worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🩹️ Running reconciliation sweep");
            match api.run_sweep(grace).await {
                Ok(result) if result.is_empty() => trace!("🩹️ Nothing to reconcile"),
                Ok(result) => {
                    info!(
                        "🩹️ {} donations repaired, {} deferred, {} failed",
                        result.repaired.len(),
                        result.deferred.len(),
                        result.failed.len()
                    );
                    debug!("🩹️ Repaired: {}", result.repaired.join(", "));
                    if !result.deferred.is_empty() {
                        debug!("🩹️ Deferred: {}", result.deferred.join(", "));
                    }
                },
                Err(e) => {
                    error!("🩹️ Error running reconciliation sweep: {e}");
                },
            }
        }
    })
}
