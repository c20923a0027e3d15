//! Multi-strategy route orchestration.
//!
//! Fans the named strategies out over a bounded set of blocking tasks
//! sharing one read-only [`RoutingContext`], joins them against a
//! deadline, and selects the best candidate for the caller's safety
//! weight. The caller always gets a best-effort answer: failed
//! strategies are dropped, and when everything fails a straight-line
//! fallback route is produced instead of an error.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};

use crate::context::RoutingContext;
use crate::cost::WaypointCostMatrix;
use crate::error::RouteError;
use crate::evaluate::evaluate_path;
use crate::models::{FindRouteRequest, Route, RouteResult, RoutingMethod, StrategyKind};
use crate::optimizer::{shortest_street_path, shortest_waypoint_path};
use crate::spatial::{haversine_distance, interpolate};
use crate::waypoints;

/// Strategies attempted against the street graph.
const STREET_STRATEGIES: [StrategyKind; 4] = [
    StrategyKind::Direct,
    StrategyKind::Balanced,
    StrategyKind::Safe,
    StrategyKind::Safest,
];

/// Strategies attempted in waypoint-graph mode.
const WAYPOINT_STRATEGIES: [StrategyKind; 6] = [
    StrategyKind::Direct,
    StrategyKind::Balanced,
    StrategyKind::Safe,
    StrategyKind::Safest,
    StrategyKind::Perimeter,
    StrategyKind::Multipath,
];

/// Tolerance when comparing candidate scores and distances.
const SCORE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
enum SearchMode {
    Street,
    Waypoint,
}

/// Runs the strategy set for one request and picks a winner.
pub struct RouteOrchestrator {
    ctx: Arc<RoutingContext>,
}

impl RouteOrchestrator {
    pub fn new(ctx: Arc<RoutingContext>) -> Self {
        Self { ctx }
    }

    /// Top-level search. Fails only on invalid arguments; every other
    /// condition degrades and is signalled through `routing_method`.
    pub async fn find_route(&self, request: &FindRouteRequest) -> Result<RouteResult, RouteError> {
        validate_request(request)?;

        let start = (request.start_lat, request.start_lng);
        let end = (request.end_lat, request.end_lng);

        let direct_m = haversine_distance(start.0, start.1, end.0, end.1);
        if direct_m < 1.0 {
            return Ok(self.degenerate_result(start, end));
        }
        let max_distance_m = direct_m * request.max_distance_factor;

        match self.search_candidates(start, end).await {
            Ok((candidates, method)) => {
                Ok(self.select(candidates, request, method, max_distance_m))
            }
            Err(RouteError::AllStrategiesFailed) => {
                tracing::warn!("all route strategies failed, producing straight-line fallback");
                let route = self.fallback_route(start, end);
                Ok(RouteResult {
                    success: true,
                    best_route: Some(route.clone()),
                    all_options: vec![route],
                    routing_method: RoutingMethod::Fallback,
                    error: None,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Street mode first when a graph is present, waypoint mode as its
    /// fallback, `AllStrategiesFailed` when neither produced anything.
    async fn search_candidates(
        &self,
        start: (f64, f64),
        end: (f64, f64),
    ) -> Result<(Vec<Route>, RoutingMethod), RouteError> {
        if self.ctx.street_graph.is_some() {
            let candidates = self
                .run_strategies(&STREET_STRATEGIES, SearchMode::Street, start, end)
                .await;
            if !candidates.is_empty() {
                return Ok((candidates, RoutingMethod::StreetGraph));
            }
            tracing::warn!("street-graph search yielded no candidates, retrying over waypoint graph");
        }

        let candidates = self
            .run_strategies(&WAYPOINT_STRATEGIES, SearchMode::Waypoint, start, end)
            .await;
        if !candidates.is_empty() {
            return Ok((candidates, RoutingMethod::WaypointGraph));
        }

        Err(RouteError::AllStrategiesFailed)
    }

    /// Spawn one blocking task per strategy and join them against the
    /// configured deadline. Results are matched back to their strategy
    /// by value; completion order carries no meaning. Tasks still
    /// running at the deadline are aborted and treated as failed.
    async fn run_strategies(
        &self,
        strategies: &[StrategyKind],
        mode: SearchMode,
        start: (f64, f64),
        end: (f64, f64),
    ) -> Vec<Route> {
        let deadline = Instant::now() + Duration::from_secs(self.ctx.config.strategy_timeout_secs);
        let mut tasks: JoinSet<(StrategyKind, Result<Route, RouteError>)> = JoinSet::new();

        for &strategy in strategies {
            let ctx = Arc::clone(&self.ctx);
            tasks.spawn_blocking(move || (strategy, run_strategy(&ctx, mode, strategy, start, end)));
        }

        let mut completed: Vec<(StrategyKind, Route)> = Vec::with_capacity(strategies.len());
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((strategy, Ok(route))))) => completed.push((strategy, route)),
                Ok(Some(Ok((strategy, Err(err))))) => {
                    tracing::warn!("strategy {strategy} dropped: {err}");
                }
                Ok(Some(Err(join_err))) => {
                    tracing::warn!("strategy task failed to join: {join_err}");
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        "strategy deadline hit, using {} completed result(s)",
                        completed.len()
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }

        // Fixed presentation order regardless of completion order.
        completed.sort_by_key(|(strategy, _)| {
            strategies.iter().position(|s| s == strategy).unwrap_or(usize::MAX)
        });
        completed.into_iter().map(|(_, route)| route).collect()
    }

    /// Canonical selection policy: maximize
    /// `(1-w) * distance_score + w * safety_score`. Ties go to the
    /// shorter route, then to the strategy whose preset weight is
    /// closest to the caller's.
    fn select(
        &self,
        mut candidates: Vec<Route>,
        request: &FindRouteRequest,
        method: RoutingMethod,
        max_distance_m: f64,
    ) -> RouteResult {
        let w = request.safety_weight;

        for route in &mut candidates {
            if route.total_distance_m > max_distance_m + 1.0 {
                route.exceeds_distance_cap = true;
                tracing::warn!(
                    strategy = %route.strategy,
                    distance_m = route.total_distance_m,
                    cap_m = max_distance_m,
                    "candidate exceeds the soft distance cap"
                );
            }
        }

        let max_dist = candidates
            .iter()
            .map(|r| r.total_distance_m)
            .fold(f64::MIN, f64::max)
            .max(1.0);

        let combined = |route: &Route| {
            let distance_score = 1.0 - route.total_distance_m / max_dist;
            let safety_score = route.avg_safety_score / 100.0;
            (1.0 - w) * distance_score + w * safety_score
        };

        let mut best = 0;
        for i in 1..candidates.len() {
            let (si, sb) = (combined(&candidates[i]), combined(&candidates[best]));
            if si > sb + SCORE_EPSILON {
                best = i;
            } else if (si - sb).abs() <= SCORE_EPSILON {
                let (di, db) = (
                    candidates[i].total_distance_m,
                    candidates[best].total_distance_m,
                );
                if di + SCORE_EPSILON < db {
                    best = i;
                } else if (di - db).abs() <= SCORE_EPSILON {
                    let pi = (candidates[i].strategy.preset_weight() - w).abs();
                    let pb = (candidates[best].strategy.preset_weight() - w).abs();
                    if pi < pb {
                        best = i;
                    }
                }
            }
        }

        let best_route = candidates[best].clone();
        tracing::debug!(
            strategy = %best_route.strategy,
            distance_m = best_route.total_distance_m,
            avg_safety = best_route.avg_safety_score,
            "selected route"
        );

        RouteResult {
            success: true,
            best_route: Some(best_route),
            all_options: candidates,
            routing_method: method,
            error: None,
        }
    }

    /// Zero-distance route for start == end.
    fn degenerate_result(&self, start: (f64, f64), end: (f64, f64)) -> RouteResult {
        let route = evaluate_path(
            &self.ctx,
            &[start, end],
            StrategyKind::Direct,
            vec![start, end],
        );
        let method = if self.ctx.grid.is_some() {
            RoutingMethod::WaypointGraph
        } else {
            RoutingMethod::Fallback
        };
        RouteResult {
            success: true,
            best_route: Some(route.clone()),
            all_options: vec![route],
            routing_method: method,
            error: None,
        }
    }

    /// Straight-line route, interpolated so safety is still scored at a
    /// realistic granularity.
    fn fallback_route(&self, start: (f64, f64), end: (f64, f64)) -> Route {
        let direct_m = haversine_distance(start.0, start.1, end.0, end.1);
        let segments = ((direct_m / self.ctx.config.fallback_interval_m).ceil() as usize).max(1);

        let mut path = Vec::with_capacity(segments + 1);
        for i in 0..=segments {
            path.push(interpolate(start, end, i as f64 / segments as f64));
        }
        // Interpolation rounding must not move the endpoints.
        path[0] = start;
        path[segments] = end;

        evaluate_path(&self.ctx, &path, StrategyKind::Direct, vec![start, end])
    }
}

/// One strategy, start to finish: generate geometry, search, evaluate.
fn run_strategy(
    ctx: &RoutingContext,
    mode: SearchMode,
    strategy: StrategyKind,
    start: (f64, f64),
    end: (f64, f64),
) -> Result<Route, RouteError> {
    match mode {
        SearchMode::Street => {
            let graph = ctx
                .street_graph
                .as_ref()
                .ok_or_else(|| RouteError::GraphUnavailable("no street graph loaded".into()))?;
            let path =
                shortest_street_path(ctx, graph, start, end, strategy.preset_weight())?;
            Ok(evaluate_path(ctx, &path, strategy, vec![start, end]))
        }
        SearchMode::Waypoint => {
            let wps = waypoints::generate(ctx, strategy, start, end);
            let matrix = WaypointCostMatrix::build(ctx, &wps, strategy.preset_weight());
            let indices = shortest_waypoint_path(&matrix, 0, wps.len() - 1);
            let path: Vec<(f64, f64)> = indices.iter().map(|&i| wps[i]).collect();
            Ok(evaluate_path(ctx, &path, strategy, wps))
        }
    }
}

fn validate_request(request: &FindRouteRequest) -> Result<(), RouteError> {
    let coords = [
        ("start_lat", request.start_lat, 90.0),
        ("end_lat", request.end_lat, 90.0),
        ("start_lng", request.start_lng, 180.0),
        ("end_lng", request.end_lng, 180.0),
    ];
    for (name, value, limit) in coords {
        if !value.is_finite() || value.abs() > limit {
            return Err(RouteError::InvalidArgument(format!(
                "{name} out of range: {value}"
            )));
        }
    }

    if !request.safety_weight.is_finite()
        || !(0.0..=1.0).contains(&request.safety_weight)
    {
        return Err(RouteError::InvalidArgument(format!(
            "safety_weight must be in [0, 1], got {}",
            request.safety_weight
        )));
    }

    if !request.max_distance_factor.is_finite() || request.max_distance_factor < 1.0 {
        return Err(RouteError::InvalidArgument(format!(
            "max_distance_factor must be >= 1, got {}",
            request.max_distance_factor
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::incidents::IncidentStore;
    use crate::models::{IncidentCategory, IncidentRecord};
    use crate::streetgraph::StreetGraph;

    const START: (f64, f64) = (37.7694, -122.4862);
    const END: (f64, f64) = (37.8087, -122.4098);
    const CLUSTER: (f64, f64) = (37.80, -122.41);

    fn cluster_store() -> Arc<IncidentStore> {
        let records = (0..20).map(|i| {
            IncidentRecord::new(
                CLUSTER.0 + (i % 4) as f64 * 0.0003,
                CLUSTER.1 + (i % 5) as f64 * 0.0003,
                IncidentCategory::Robbery,
                "2025-06-01T22:30:00Z".parse().unwrap(),
            )
        });
        Arc::new(IncidentStore::from_records(records))
    }

    fn orchestrator(street_graph: Option<Arc<StreetGraph>>) -> RouteOrchestrator {
        let ctx = RoutingContext::for_request(
            cluster_store(),
            street_graph,
            RouterConfig::default(),
            START,
            END,
        );
        RouteOrchestrator::new(Arc::new(ctx))
    }

    fn request(weight: f64) -> FindRouteRequest {
        FindRouteRequest::new(START, END).with_safety_weight(weight)
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected_before_search() {
        let orch = orchestrator(None);

        let bad_weight = request(1.5);
        assert!(matches!(
            orch.find_route(&bad_weight).await,
            Err(RouteError::InvalidArgument(_))
        ));

        let mut bad_lat = request(0.5);
        bad_lat.start_lat = 123.0;
        assert!(matches!(
            orch.find_route(&bad_lat).await,
            Err(RouteError::InvalidArgument(_))
        ));

        let mut bad_factor = request(0.5);
        bad_factor.max_distance_factor = 0.5;
        assert!(matches!(
            orch.find_route(&bad_factor).await,
            Err(RouteError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn routes_start_and_end_at_the_requested_points() {
        let orch = orchestrator(None);
        let result = orch.find_route(&request(0.7)).await.unwrap();

        assert!(result.success);
        for route in &result.all_options {
            let first = &route.points[0];
            let last = route.points.last().unwrap();
            assert!((first.lat - START.0).abs() < 1e-6);
            assert!((first.lng - START.1).abs() < 1e-6);
            assert!((last.lat - END.0).abs() < 1e-6);
            assert!((last.lng - END.1).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn degenerate_request_returns_zero_distance_route() {
        let orch = orchestrator(None);
        let result = orch
            .find_route(&FindRouteRequest::new(START, START))
            .await
            .unwrap();

        let route = result.best_route.unwrap();
        assert_eq!(route.total_distance_m, 0.0);
        let ctx = RoutingContext::for_request(
            cluster_store(),
            None,
            RouterConfig::default(),
            START,
            END,
        );
        assert_eq!(route.avg_safety_score, ctx.safety_score(START.0, START.1));
    }

    #[tokio::test]
    async fn without_street_graph_method_is_never_street() {
        let orch = orchestrator(None);
        let result = orch.find_route(&request(0.7)).await.unwrap();

        assert!(result.success);
        assert_ne!(result.routing_method, RoutingMethod::StreetGraph);
    }

    #[tokio::test]
    async fn high_weight_avoids_the_incident_cluster() {
        let orch = orchestrator(None);

        let safe = orch.find_route(&request(0.9)).await.unwrap();
        let fast = orch.find_route(&request(0.1)).await.unwrap();

        let direct_m = haversine_distance(START.0, START.1, END.0, END.1);
        let cap = direct_m * 2.0;

        let safe_route = safe.best_route.unwrap();
        // No point of the safe route may fall inside the cluster disk
        // (0.005 degrees is roughly 550m here).
        let disk_m = 0.005 * 111_000.0;
        for p in &safe_route.points {
            let d = haversine_distance(p.lat, p.lng, CLUSTER.0, CLUSTER.1);
            assert!(
                d > disk_m,
                "safe route enters the cluster disk at ({}, {}), {d:.0}m from center",
                p.lat,
                p.lng
            );
        }

        let fast_route = fast.best_route.unwrap();
        assert!(safe_route.total_distance_m <= cap + 1.0);
        assert!(fast_route.total_distance_m <= cap + 1.0);
        assert!(safe_route.avg_safety_score >= fast_route.avg_safety_score);
    }

    #[tokio::test]
    async fn raising_the_weight_never_lowers_selected_safety() {
        let orch = orchestrator(None);
        let low = orch.find_route(&request(0.1)).await.unwrap();
        let high = orch.find_route(&request(0.95)).await.unwrap();

        let low_safety = low.best_route.unwrap().avg_safety_score;
        let high_safety = high.best_route.unwrap().avg_safety_score;
        assert!(high_safety >= low_safety);
    }

    #[tokio::test]
    async fn repeated_runs_are_bit_identical() {
        let orch = orchestrator(None);
        let a = orch.find_route(&request(0.7)).await.unwrap();
        let b = orch.find_route(&request(0.7)).await.unwrap();

        let ra = a.best_route.unwrap();
        let rb = b.best_route.unwrap();
        assert_eq!(ra.total_distance_m.to_bits(), rb.total_distance_m.to_bits());
        assert_eq!(ra.avg_safety_score.to_bits(), rb.avg_safety_score.to_bits());
        assert_eq!(ra.points.len(), rb.points.len());
        assert_eq!(a.all_options.len(), b.all_options.len());
    }

    #[tokio::test]
    async fn street_graph_mode_uses_the_network() {
        // A small connected grid roughly spanning the request area.
        let graph = StreetGraph::from_json_str(
            r#"{
                "nodes": [
                    {"id": 1, "lat": 37.7695, "lng": -122.4860},
                    {"id": 2, "lat": 37.7800, "lng": -122.4600},
                    {"id": 3, "lat": 37.7900, "lng": -122.4350},
                    {"id": 4, "lat": 37.8000, "lng": -122.4200},
                    {"id": 5, "lat": 37.8086, "lng": -122.4100},
                    {"id": 6, "lat": 37.7950, "lng": -122.4550}
                ],
                "edges": [
                    {"from": 1, "to": 2},
                    {"from": 2, "to": 3},
                    {"from": 3, "to": 4},
                    {"from": 4, "to": 5},
                    {"from": 2, "to": 6},
                    {"from": 6, "to": 3}
                ]
            }"#,
        )
        .unwrap();

        let orch = orchestrator(Some(Arc::new(graph)));
        let result = orch.find_route(&request(0.7)).await.unwrap();

        assert_eq!(result.routing_method, RoutingMethod::StreetGraph);
        let route = result.best_route.unwrap();
        // Street routes visit real nodes between the endpoints.
        assert!(route.points.len() > 2);
        assert!((route.points[0].lat - START.0).abs() < 1e-6);
        assert!((route.points.last().unwrap().lat - END.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn unreachable_street_graph_falls_back_to_waypoints() {
        // Two disconnected islands: street search cannot connect them.
        let graph = StreetGraph::from_json_str(
            r#"{
                "nodes": [
                    {"id": 1, "lat": 37.7695, "lng": -122.4860},
                    {"id": 2, "lat": 37.8086, "lng": -122.4100}
                ],
                "edges": []
            }"#,
        )
        .unwrap();

        let orch = orchestrator(Some(Arc::new(graph)));
        let result = orch.find_route(&request(0.7)).await.unwrap();

        assert!(result.success);
        assert_eq!(result.routing_method, RoutingMethod::WaypointGraph);
    }
}
