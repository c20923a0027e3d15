//! Expiry and size bounds for the safety-grid cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use safepath_core::{GridKey, SafetyGrid};

/// A built grid plus the moment it was built.
#[derive(Clone)]
pub struct CachedGrid {
    pub grid: Arc<SafetyGrid>,
    pub built_at: Instant,
}

/// Drop expired grids, then evict oldest-first down to `max_entries`.
///
/// Grids are pure functions of (dataset, bounding box); age-based
/// expiry only bounds memory, correctness-wise entries live until the
/// dataset is reloaded, which clears the whole map.
pub fn prune_grid_cache(
    cache: &DashMap<GridKey, CachedGrid>,
    max_entries: usize,
    max_age: Duration,
) {
    let now = Instant::now();
    let mut entries: Vec<(GridKey, Instant)> = cache
        .iter()
        .map(|entry| (*entry.key(), entry.value().built_at))
        .collect();

    for (key, built_at) in &entries {
        if now.duration_since(*built_at) > max_age {
            cache.remove(key);
        }
    }

    if cache.len() <= max_entries {
        return;
    }

    entries.sort_by_key(|(_, built_at)| *built_at);
    for (key, _) in entries {
        if cache.len() <= max_entries {
            break;
        }
        cache.remove(&key);
    }
}
