use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::state::AppState;

/// Periodically drop unclaimed uploads and stale access windows.
pub async fn run(state: AppState) {
    let ttl = Duration::from_secs(state.config.upload.pending_ttl_secs);
    let mut ticker = interval(Duration::from_secs(
        state.config.upload.sweep_interval_secs.max(1),
    ));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep_once(&state, ttl).await;
    }
}

/// One sweep pass. Returns the number of pending uploads removed.
pub async fn sweep_once(state: &AppState, ttl: Duration) -> usize {
    let expired = state.pending.take_expired(ttl);
    for upload in &expired {
        state.uploads.discard_relative(&upload.file_path).await;
    }
    if !expired.is_empty() {
        info!(count = expired.len(), "Removed expired pending uploads");
    }

    let pruned = state.access.prune_expired();
    if pruned > 0 {
        debug!(count = pruned, "Pruned expired access windows");
    }

    expired.len()
}
