//! Edge cost models combining physical distance with safety.

use crate::context::RoutingContext;
use crate::spatial::haversine_distance;

/// Pairwise costs over a complete waypoint graph.
///
/// Distances and safety terms are normalized across the whole edge set
/// before being combined, so the safety weight trades off comparable
/// quantities.
pub struct WaypointCostMatrix {
    n: usize,
    costs: Vec<f64>,
    distances: Vec<f64>,
}

impl WaypointCostMatrix {
    /// Build the matrix for one strategy run.
    ///
    /// The safety term of an edge is the average of its endpoints'
    /// scores; `cost = (1-w) * dist_norm + w * (1 - safety_norm)`.
    pub fn build(ctx: &RoutingContext, points: &[(f64, f64)], safety_weight: f64) -> Self {
        let n = points.len();
        let w = safety_weight.clamp(0.0, 1.0);

        let scores: Vec<f64> = points
            .iter()
            .map(|p| ctx.safety_score(p.0, p.1))
            .collect();

        let mut distances = vec![0.0; n * n];
        let mut safety = vec![0.0; n * n];
        let mut max_dist: f64 = 0.0;
        let mut max_safety: f64 = 0.0;

        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let d = haversine_distance(points[i].0, points[i].1, points[j].0, points[j].1);
                let s = (scores[i] + scores[j]) / 2.0;
                distances[i * n + j] = d;
                safety[i * n + j] = s;
                max_dist = max_dist.max(d);
                max_safety = max_safety.max(s);
            }
        }

        // Degenerate sets (all points coincident) normalize to zero.
        let max_dist = if max_dist > 0.0 { max_dist } else { 1.0 };
        let max_safety = if max_safety > 0.0 { max_safety } else { 1.0 };

        let costs = (0..n * n)
            .map(|idx| {
                let dist_norm = distances[idx] / max_dist;
                let safety_norm = safety[idx] / max_safety;
                (1.0 - w) * dist_norm + w * (1.0 - safety_norm)
            })
            .collect();

        Self {
            n,
            costs,
            distances,
        }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn cost(&self, from: usize, to: usize) -> f64 {
        self.costs[from * self.n + to]
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.n + to]
    }
}

/// Multiplier applied to a street edge's length.
///
/// Below the low weight threshold the search is a plain shortest-path;
/// above the high threshold the strong penalty divisor applies, with an
/// extreme divisor for near-maximal weights; in between a milder
/// divisor keeps detours moderate. Always >= 1, which keeps the
/// haversine A* heuristic admissible.
pub fn street_edge_factor(
    ctx: &RoutingContext,
    safety_weight: f64,
    mid_lat: f64,
    mid_lng: f64,
) -> f64 {
    let cfg = &ctx.config;
    if safety_weight < cfg.street_weight_low {
        return 1.0;
    }

    let k = if safety_weight >= 0.9 {
        cfg.street_k_extreme
    } else if safety_weight > cfg.street_weight_high {
        cfg.street_k_strong
    } else {
        cfg.street_k_mild
    };

    1.0 + (100.0 - ctx.safety_score(mid_lat, mid_lng)) / k
}
