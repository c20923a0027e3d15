//! Safety-aware route search engine.
//!
//! Builds a spatial risk model from historical point incidents, generates
//! candidate routes under several strategies, scores them by distance and
//! derived safety, and selects the best for a caller-chosen trade-off.

pub mod config;
pub mod context;
pub mod cost;
pub mod error;
pub mod evaluate;
pub mod grid;
pub mod incidents;
pub mod models;
pub mod optimizer;
pub mod orchestrator;
pub mod spatial;
pub mod streetgraph;
pub mod waypoints;

pub use config::RouterConfig;
pub use context::RoutingContext;
pub use error::RouteError;
pub use grid::{GridKey, SafetyGrid};
pub use incidents::IncidentStore;
pub use models::{
    BoundingBox, FindRouteRequest, Grade, IncidentCategory, IncidentRecord, Route, RoutePoint,
    RouteResult, RoutingMethod, StrategyKind,
};
pub use orchestrator::RouteOrchestrator;
pub use spatial::haversine_distance;
pub use streetgraph::StreetGraph;
