//! Error taxonomy for the routing engine.

use thiserror::Error;

/// Errors produced by the routing subsystem.
///
/// Only `InvalidArgument` is ever surfaced to callers of the top-level
/// API; everything else is handled internally by degrading to a less
/// precise routing mode.
#[derive(Debug, Error)]
pub enum RouteError {
    /// Coordinates or weights outside their valid ranges. Rejected
    /// synchronously, before any computation begins.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No usable incidents fell inside the requested region, so a
    /// safety grid could not be built.
    #[error("no valid incidents in the requested region")]
    EmptyDataset,

    /// A search found no connecting path between the resolved nodes.
    /// The affected strategy is dropped; others continue.
    #[error("no path found: {0}")]
    NoPath(String),

    /// Every strategy failed. Raised internally to trigger the
    /// straight-line fallback, never returned to the caller.
    #[error("all route strategies failed")]
    AllStrategiesFailed,

    /// The street network is not loaded or has no nodes.
    #[error("street graph unavailable: {0}")]
    GraphUnavailable(String),

    #[error("incident data error: {0}")]
    Csv(#[from] csv::Error),
}
