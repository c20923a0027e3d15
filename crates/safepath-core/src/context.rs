//! Shared, immutable per-request context.

use std::sync::Arc;

use crate::config::RouterConfig;
use crate::error::RouteError;
use crate::grid::SafetyGrid;
use crate::incidents::IncidentStore;
use crate::models::BoundingBox;
use crate::streetgraph::StreetGraph;

/// Everything a strategy needs, bundled once and shared read-only.
///
/// There is no process-global state in the engine: each request gets a
/// context (the grid may come from a caller-managed cache) and every
/// component reads through it. Nothing here is mutated after
/// construction, which is what makes the strategy fan-out race-free.
#[derive(Clone)]
pub struct RoutingContext {
    pub incidents: Arc<IncidentStore>,
    pub grid: Option<Arc<SafetyGrid>>,
    pub street_graph: Option<Arc<StreetGraph>>,
    pub config: RouterConfig,
}

impl RoutingContext {
    pub fn new(
        incidents: Arc<IncidentStore>,
        grid: Option<Arc<SafetyGrid>>,
        street_graph: Option<Arc<StreetGraph>>,
        config: RouterConfig,
    ) -> Self {
        Self {
            incidents,
            grid,
            street_graph,
            config,
        }
    }

    /// Build a context for one start/end pair, constructing the grid
    /// from the expanded bounding box of the request.
    ///
    /// An empty region is not an error at this level: the context simply
    /// carries no grid and scoring degrades to the neutral constant.
    pub fn for_request(
        incidents: Arc<IncidentStore>,
        street_graph: Option<Arc<StreetGraph>>,
        config: RouterConfig,
        start: (f64, f64),
        end: (f64, f64),
    ) -> Self {
        let bounds = BoundingBox::around(start, end).expanded(config.grid_margin_deg);
        let grid = match SafetyGrid::build(&incidents, bounds, config.cell_size_m) {
            Ok(grid) => Some(Arc::new(grid)),
            Err(RouteError::EmptyDataset) => {
                tracing::debug!("no incidents in request region, using neutral safety score");
                None
            }
            Err(err) => {
                tracing::warn!("safety grid build failed: {err}");
                None
            }
        };
        Self::new(incidents, grid, street_graph, config)
    }

    /// Safety score at a coordinate: grid lookup, or the neutral
    /// constant when no grid exists (degraded mode).
    pub fn safety_score(&self, lat: f64, lng: f64) -> f64 {
        match &self.grid {
            Some(grid) => grid.score(lat, lng),
            None => self.config.neutral_safety_score,
        }
    }
}
