//! Safety probe and dataset management endpoints.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use safepath_core::Grade;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScoreQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub lat: f64,
    pub lng: f64,
    pub safety_score: f64,
    pub grade: Grade,
    pub nearby_incidents: u32,
}

/// Point safety probe: grid score plus the precise nearby count.
pub async fn safety_score(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScoreQuery>,
) -> Result<Json<ScoreResponse>, StatusCode> {
    if !query.lat.is_finite()
        || !query.lng.is_finite()
        || query.lat.abs() > 90.0
        || query.lng.abs() > 180.0
    {
        return Err(StatusCode::BAD_REQUEST);
    }

    let point = (query.lat, query.lng);
    let score = match state.grid_for(point, point) {
        Some(grid) => grid.score(query.lat, query.lng),
        None => state.router_config().neutral_safety_score,
    };
    let nearby = state.incidents().nearby_count(
        query.lat,
        query.lng,
        state.router_config().nearby_radius_m,
    );

    Ok(Json(ScoreResponse {
        lat: query.lat,
        lng: query.lng,
        safety_score: score,
        grade: Grade::from_score(score),
        nearby_incidents: nearby,
    }))
}

/// Reload the incident CSV and drop every cached grid.
pub async fn reload_incidents(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<serde_json::Value>) {
    match state.reload_incidents() {
        Ok(count) => (StatusCode::OK, Json(json!({ "reloaded": count }))),
        Err(err) => {
            tracing::error!("incident reload failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
        }
    }
}
