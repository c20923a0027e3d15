use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::api::{route, safety};
use crate::state::AppState;

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/route", post(route::find_route))
        .route("/v1/route/compare", get(route::compare_routes))
        .route("/v1/safety/score", get(safety::safety_score))
        .route("/v1/incidents/reload", post(safety::reload_incidents))
}
