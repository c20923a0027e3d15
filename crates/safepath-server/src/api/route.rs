//! Route search endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;

use safepath_core::{
    FindRouteRequest, Grade, Route, RouteError, RouteOrchestrator, RouteResult, StrategyKind,
};

use crate::state::AppState;

/// Find the best route for the caller's safety/speed trade-off.
pub async fn find_route(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FindRouteRequest>,
) -> Response {
    match run_search(&state, &request).await {
        Ok(result) => Json(result).into_response(),
        Err(err) => error_response(err),
    }
}

/// Per-strategy comparison of every candidate the search produced.
pub async fn compare_routes(
    State(state): State<Arc<AppState>>,
    Query(request): Query<FindRouteRequest>,
) -> Response {
    match run_search(&state, &request).await {
        Ok(result) => {
            let selected = result
                .best_route
                .as_ref()
                .map(|route| route.strategy);
            let options: Vec<RouteSummary> = result
                .all_options
                .iter()
                .map(|route| RouteSummary::new(route, selected == Some(route.strategy)))
                .collect();
            Json(json!({
                "success": result.success,
                "routing_method": result.routing_method,
                "options": options,
            }))
            .into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn run_search(
    state: &Arc<AppState>,
    request: &FindRouteRequest,
) -> Result<RouteResult, RouteError> {
    let start = (request.start_lat, request.start_lng);
    let end = (request.end_lat, request.end_lng);
    let ctx = Arc::new(state.context_for(start, end));
    RouteOrchestrator::new(ctx).find_route(request).await
}

fn error_response(err: RouteError) -> Response {
    let status = match err {
        RouteError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(json!({
            "success": false,
            "best_route": null,
            "all_options": [],
            "error": err.to_string(),
        })),
    )
        .into_response()
}

#[derive(Debug, Serialize)]
pub struct RouteSummary {
    pub strategy: StrategyKind,
    pub total_distance_m: f64,
    pub avg_safety_score: f64,
    pub total_incidents: u32,
    pub safety_grade: Grade,
    pub waypoint_count: usize,
    pub exceeds_distance_cap: bool,
    pub selected: bool,
}

impl RouteSummary {
    fn new(route: &Route, selected: bool) -> Self {
        Self {
            strategy: route.strategy,
            total_distance_m: route.total_distance_m,
            avg_safety_score: route.avg_safety_score,
            total_incidents: route.total_incidents,
            safety_grade: route.safety_grade,
            waypoint_count: route.waypoints.len(),
            exceeds_distance_cap: route.exceeds_distance_cap,
            selected,
        }
    }
}
