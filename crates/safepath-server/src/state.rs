//! Shared application state: the incident dataset, the optional street
//! graph, and the per-region grid cache.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use safepath_core::{
    BoundingBox, GridKey, IncidentStore, RouteError, RouterConfig, RoutingContext, SafetyGrid,
    StreetGraph,
};

use crate::cache::{prune_grid_cache, CachedGrid};
use crate::config::Config;

pub struct AppState {
    config: Config,
    router_config: RouterConfig,
    incidents: RwLock<Arc<IncidentStore>>,
    street_graph: Option<Arc<StreetGraph>>,
    grids: DashMap<GridKey, CachedGrid>,
}

impl AppState {
    pub fn new(
        config: Config,
        router_config: RouterConfig,
        incidents: Arc<IncidentStore>,
        street_graph: Option<Arc<StreetGraph>>,
    ) -> Self {
        Self {
            config,
            router_config,
            incidents: RwLock::new(incidents),
            street_graph,
            grids: DashMap::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router_config(&self) -> &RouterConfig {
        &self.router_config
    }

    /// Current dataset snapshot. Requests hold the `Arc`, so a reload
    /// never invalidates data mid-request.
    pub fn incidents(&self) -> Arc<IncidentStore> {
        self.incidents
            .read()
            .expect("incident store lock poisoned")
            .clone()
    }

    /// Assemble the immutable context for one routing request, reusing
    /// a cached grid for the quantized bounding box when possible.
    pub fn context_for(&self, start: (f64, f64), end: (f64, f64)) -> RoutingContext {
        let grid = self.grid_for(start, end);
        RoutingContext::new(
            self.incidents(),
            grid,
            self.street_graph.clone(),
            self.router_config.clone(),
        )
    }

    /// Look up or build the safety grid covering a request region.
    ///
    /// Empty regions yield `None` (the engine degrades to the neutral
    /// score) and are not cached, since they are cheap to rediscover.
    pub fn grid_for(&self, start: (f64, f64), end: (f64, f64)) -> Option<Arc<SafetyGrid>> {
        let bounds =
            BoundingBox::around(start, end).expanded(self.router_config.grid_margin_deg);
        let key = GridKey::from_bounds(&bounds);

        if let Some(entry) = self.grids.get(&key) {
            return Some(entry.grid.clone());
        }

        let incidents = self.incidents();
        match SafetyGrid::build(&incidents, bounds, self.router_config.cell_size_m) {
            Ok(grid) => {
                let grid = Arc::new(grid);
                self.grids.insert(
                    key,
                    CachedGrid {
                        grid: grid.clone(),
                        built_at: Instant::now(),
                    },
                );
                Some(grid)
            }
            Err(RouteError::EmptyDataset) => None,
            Err(err) => {
                tracing::warn!("grid build failed: {err}");
                None
            }
        }
    }

    /// Reload the incident CSV and invalidate every cached grid.
    pub fn reload_incidents(&self) -> Result<usize, RouteError> {
        let store = IncidentStore::load_from_csv(
            &self.config.incident_csv,
            Utc::now(),
            &self.router_config,
        )?;
        let count = store.len();

        *self
            .incidents
            .write()
            .expect("incident store lock poisoned") = Arc::new(store);
        self.grids.clear();

        tracing::info!(count, "incident dataset reloaded, grid cache cleared");
        Ok(count)
    }

    pub fn grid_cache_len(&self) -> usize {
        self.grids.len()
    }

    pub fn prune_grids(&self) {
        prune_grid_cache(
            &self.grids,
            self.config.grid_cache_max_entries,
            Duration::from_secs(self.config.grid_cache_max_age_secs),
        );
    }
}
