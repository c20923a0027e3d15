//! Tunables for the routing engine.

use serde::{Deserialize, Serialize};

/// Configuration for grid construction, waypoint generation and search.
///
/// Every knob the engine uses lives here so callers can hold one
/// immutable config per deployment instead of scattering constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Safety grid cell size in meters
    pub cell_size_m: f64,
    /// Margin added around the start/end bounding box before building
    /// the grid, in degrees
    pub grid_margin_deg: f64,
    /// Score substituted when no grid exists at all (degraded mode)
    pub neutral_safety_score: f64,
    /// A waypoint only moves to a ring candidate that beats its current
    /// score by at least this much
    pub safer_threshold: f64,

    /// Spacing of interpolated waypoints for safety-focused strategies
    pub waypoint_interval_safety_m: f64,
    /// Spacing of interpolated waypoints for the balanced strategy
    pub waypoint_interval_balanced_m: f64,
    /// Ring candidates searched around each safety-focused waypoint
    pub ring_candidates_safety: usize,
    pub ring_radius_safety_m: f64,
    /// Ring candidates searched around each balanced waypoint
    pub ring_candidates_balanced: usize,
    pub ring_radius_balanced_m: f64,
    /// Random jitter applied to balanced waypoints, meters
    pub waypoint_jitter_m: f64,
    /// Radius of the perimeter ring around the route midpoint
    pub perimeter_radius_m: f64,
    /// Points placed on the perimeter ring
    pub perimeter_points: usize,

    /// Radius for the nearby-incident count on the final report
    pub nearby_radius_m: f64,
    /// Spacing of interpolated points for the straight-line fallback
    pub fallback_interval_m: f64,

    /// Street cost: below this weight, plain edge length is used
    pub street_weight_low: f64,
    /// Street cost: above this weight, the strong safety penalty is used
    pub street_weight_high: f64,
    /// Penalty divisors for the street cost model; smaller K means
    /// safety dominates more
    pub street_k_mild: f64,
    pub street_k_strong: f64,
    pub street_k_extreme: f64,

    /// Deadline for the whole strategy fan-out
    pub strategy_timeout_secs: u64,
    /// Seed for the waypoint generators' exploratory jitter; fixed so
    /// identical requests produce identical routes
    pub rng_seed: u64,
    /// Incidents older than this many days before the reference time
    /// are dropped at load
    pub incident_recency_days: i64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cell_size_m: 150.0,
            grid_margin_deg: 0.02,
            neutral_safety_score: 70.0,
            safer_threshold: 10.0,

            waypoint_interval_safety_m: 200.0,
            waypoint_interval_balanced_m: 300.0,
            ring_candidates_safety: 12,
            ring_radius_safety_m: 200.0,
            ring_candidates_balanced: 8,
            ring_radius_balanced_m: 100.0,
            waypoint_jitter_m: 30.0,
            perimeter_radius_m: 500.0,
            perimeter_points: 4,

            nearby_radius_m: 75.0,
            fallback_interval_m: 200.0,

            street_weight_low: 0.3,
            street_weight_high: 0.7,
            street_k_mild: 200.0,
            street_k_strong: 100.0,
            street_k_extreme: 50.0,

            strategy_timeout_secs: 30,
            rng_seed: 7,
            incident_recency_days: 730,
        }
    }
}
