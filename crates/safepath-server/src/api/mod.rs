//! API routes for the safepath server.

pub mod route;
mod routes;
pub mod safety;

use axum::Router;

pub fn routes() -> Router<std::sync::Arc<crate::state::AppState>> {
    routes::create_router()
}
