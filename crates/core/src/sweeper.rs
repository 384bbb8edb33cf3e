//! Periodic removal of expired references.
//!
//! Expired references are already invisible to lookups; the sweeper only reclaims the space.
//! It is started by the runner binary when a TTL is configured.

use crate::store::ReferenceStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Runs [`ReferenceStore::purge_expired`] every `interval` until `shutdown` flips to `true`.
///
/// Each sweep is bounded by `store_timeout`. Store failures and timeouts are logged and the
/// sweep is retried on the next tick.
pub fn spawn_expiry_sweeper(
    store: Arc<dyn ReferenceStore>,
    interval: Duration,
    store_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let sweep = store.purge_expired(Utc::now());
                    match tokio::time::timeout(store_timeout, sweep).await {
                        Ok(Ok(0)) => {}
                        Ok(Ok(purged)) => tracing::info!(purged, "purged expired references"),
                        Ok(Err(e)) => tracing::warn!("expiry sweep failed: {}", e),
                        Err(_) => {
                            tracing::warn!("expiry sweep timed out after {:?}", store_timeout)
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("expiry sweeper stopping");
                        break;
                    }
                }
            }
        }
    })
}
