//! Expiration Sweeper
//!
//! Background task that periodically evicts expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp, CacheStore};

/// Spawns a background task that evicts expired entries every `tick`.
///
/// The task runs for as long as the runtime does. The returned handle can
/// be aborted by embedders that need to stop it.
///
/// # Example
/// ```ignore
/// let store = Arc::new(CacheStore::new());
/// let sweeper = spawn_sweeper(store.clone(), Duration::from_secs(1));
/// // Later, during shutdown:
/// sweeper.abort();
/// ```
pub fn spawn_sweeper(store: Arc<CacheStore>, tick: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting expiration sweeper with interval of {:?}", tick);

        let mut ticker = tokio::time::interval(tick);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep_once(&store, current_timestamp());
        }
    })
}

/// Runs one sweep at `now` and returns the number of evicted entries.
pub fn sweep_once(store: &CacheStore, now: i64) -> usize {
    match store.sweep_expired(now) {
        Ok(evicted) => {
            for key in &evicted {
                debug!(key = %key, "evicted");
            }
            if evicted.is_empty() {
                debug!("sweep: no expired entries");
            } else {
                let stats = store.stats();
                info!(
                    "sweep: evicted {} entries, {} remaining, hit rate {:.2}",
                    evicted.len(),
                    stats.total_entries,
                    stats.hit_rate()
                );
            }
            evicted.len()
        }
        Err(e) => {
            warn!(error = %e, "sweep failed");
            0
        }
    }
}
