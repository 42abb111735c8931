use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use crate::services::store::QueueStore;

/// Periodic grace-period sweeper.
///
/// Runs in-process so it shares the per-salon locks with live requests:
/// each sweep acquires a salon's lock the same way any staff or customer
/// action does, so timeout transitions interleave safely. Sweeping an
/// already-terminal entry is a no-op, so overlapping runs are harmless.
pub async fn run(store: Arc<QueueStore>, interval: Duration) {
    tracing::info!(interval_s = interval.as_secs(), "no-show sweeper started");
    loop {
        sleep(interval).await;
        let now = Utc::now();
        for salon_id in store.live_salon_ids() {
            match store.sweep_no_shows(salon_id, now).await {
                Ok(expired) if !expired.is_empty() => {
                    tracing::info!(
                        salon_id = %salon_id,
                        count = expired.len(),
                        "grace period expired for unconfirmed arrivals"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    // Transient persistence failures only; the next tick
                    // retries the same salon.
                    tracing::error!(salon_id = %salon_id, error = %e, "no-show sweep failed");
                }
            }
        }
    }
}
