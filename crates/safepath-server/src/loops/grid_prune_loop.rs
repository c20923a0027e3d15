//! Periodic eviction of stale safety grids.
//!
//! Grids are only invalidated by dataset reloads; this loop bounds the
//! cache's memory footprint between reloads.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::state::AppState;

const PRUNE_INTERVAL_SECS: u64 = 60;

pub async fn run_grid_prune_loop(state: Arc<AppState>) {
    let mut ticker = interval(Duration::from_secs(PRUNE_INTERVAL_SECS));

    loop {
        ticker.tick().await;

        let before = state.grid_cache_len();
        state.prune_grids();
        let after = state.grid_cache_len();

        if after < before {
            tracing::debug!(evicted = before - after, remaining = after, "pruned grid cache");
        }
    }
}
