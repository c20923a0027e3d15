//! Safepath server - HTTP API for safety-aware route search.

use anyhow::Result;
use axum::routing::get;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safepath_core::{IncidentStore, RouterConfig, StreetGraph};
use safepath_server::config::Config;
use safepath_server::state::AppState;
use safepath_server::{api, loops};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("safepath_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting safepath server...");

    let config = Config::from_env();
    let router_config = RouterConfig::default();
    let port = config.server_port;

    let incidents = match IncidentStore::load_from_csv(
        &config.incident_csv,
        Utc::now(),
        &router_config,
    ) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            // Degraded mode: the engine still answers with neutral
            // safety scores.
            tracing::warn!(
                "could not load incident data from {}: {err}; starting with empty dataset",
                config.incident_csv
            );
            Arc::new(IncidentStore::default())
        }
    };

    let street_graph = match &config.street_graph_path {
        Some(path) => match std::fs::File::open(path)
            .map_err(anyhow::Error::from)
            .and_then(|f| StreetGraph::from_json_reader(f).map_err(anyhow::Error::from))
        {
            Ok(graph) => Some(Arc::new(graph)),
            Err(err) => {
                tracing::warn!("street graph unavailable ({path}): {err}; routing over waypoints");
                None
            }
        },
        None => None,
    };

    let state = Arc::new(AppState::new(config, router_config, incidents, street_graph));

    tokio::spawn(loops::grid_prune_loop::run_grid_prune_loop(state.clone()));

    let app = api::routes()
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
