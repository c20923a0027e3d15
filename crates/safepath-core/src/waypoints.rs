//! Candidate waypoint generation between a start and end coordinate.
//!
//! Waypoints are free points, not street locations; snapping to real
//! geometry (when a street graph exists) happens in the optimizer.
//! Every generator upholds the same contract: the sequence starts with
//! `start`, ends with `end`, and intermediate points strictly increase
//! in progress along the route axis.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::context::RoutingContext;
use crate::models::StrategyKind;
use crate::spatial::{
    haversine_distance, interpolate, lat_to_meters, lng_to_meters, midpoint, offset_by_bearing,
    progress_along,
};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// Generate waypoints for one strategy.
///
/// Degenerate inputs (start == end) return `[start, end]` without
/// error. Jitter is derived from the configured seed and the strategy,
/// so identical requests always produce identical waypoints.
pub fn generate(
    ctx: &RoutingContext,
    strategy: StrategyKind,
    start: (f64, f64),
    end: (f64, f64),
) -> Vec<(f64, f64)> {
    if haversine_distance(start.0, start.1, end.0, end.1) < 1.0 {
        return vec![start, end];
    }

    let mut rng = StdRng::seed_from_u64(ctx.config.rng_seed ^ strategy_salt(strategy));

    let intermediates = match strategy {
        StrategyKind::Direct => Vec::new(),
        StrategyKind::Balanced => safety_seeking(ctx, start, end, false, &mut rng),
        StrategyKind::Safe | StrategyKind::Safest => {
            safety_seeking(ctx, start, end, true, &mut rng)
        }
        StrategyKind::Perimeter => perimeter(ctx, start, end),
        StrategyKind::Multipath => multipath(ctx, start, end, &mut rng),
    };

    enforce_progress(start, end, intermediates)
}

fn strategy_salt(strategy: StrategyKind) -> u64 {
    match strategy {
        StrategyKind::Direct => 0x01,
        StrategyKind::Balanced => 0x02,
        StrategyKind::Safe => 0x03,
        StrategyKind::Safest => 0x04,
        StrategyKind::Perimeter => 0x05,
        StrategyKind::Multipath => 0x06,
    }
}

/// Interpolate along the direct line, nudging each point toward the
/// safest nearby cell.
///
/// `safety_focus` controls density and search aggressiveness: the
/// safety-focused variant samples more points and searches a wider
/// ring; the balanced variant adds a little seeded jitter so it does
/// not shadow the direct route exactly.
fn safety_seeking(
    ctx: &RoutingContext,
    start: (f64, f64),
    end: (f64, f64),
    safety_focus: bool,
    rng: &mut StdRng,
) -> Vec<(f64, f64)> {
    let cfg = &ctx.config;
    let direct_m = haversine_distance(start.0, start.1, end.0, end.1);

    let (interval, min_points, candidates, radius) = if safety_focus {
        (
            cfg.waypoint_interval_safety_m,
            5,
            cfg.ring_candidates_safety,
            cfg.ring_radius_safety_m,
        )
    } else {
        (
            cfg.waypoint_interval_balanced_m,
            3,
            cfg.ring_candidates_balanced,
            cfg.ring_radius_balanced_m,
        )
    };
    let n = ((direct_m / interval) as usize).max(min_points);

    let mut points = Vec::with_capacity(n.saturating_sub(1));
    for i in 1..n {
        let fraction = i as f64 / n as f64;
        let (mut lat, mut lng) = interpolate(start, end, fraction);

        if !safety_focus {
            let jitter = cfg.waypoint_jitter_m;
            let dlat = rng.random_range(-1.0..1.0) * jitter;
            let dlng = rng.random_range(-1.0..1.0) * jitter;
            lat += dlat / lat_to_meters(1.0, lat);
            lng += dlng / lng_to_meters(1.0, lat);
        }

        points.push(improve_locally(ctx, (lat, lng), candidates, radius));
    }
    points
}

/// Place points on a ring around the route midpoint, then improve each
/// one locally. Ordering along the route axis is restored by
/// [`enforce_progress`].
fn perimeter(ctx: &RoutingContext, start: (f64, f64), end: (f64, f64)) -> Vec<(f64, f64)> {
    let cfg = &ctx.config;
    let center = midpoint(start, end);
    let n = cfg.perimeter_points.max(2);

    (1..=n)
        .map(|i| {
            let angle = (i as f64 / (n + 1) as f64) * TWO_PI;
            let point = offset_by_bearing(center.0, center.1, cfg.perimeter_radius_m, angle);
            improve_locally(
                ctx,
                point,
                cfg.ring_candidates_safety,
                cfg.ring_radius_safety_m,
            )
        })
        .collect()
}

/// Merge safety-seeking and perimeter sequences by alternating their
/// intermediate points.
fn multipath(
    ctx: &RoutingContext,
    start: (f64, f64),
    end: (f64, f64),
    rng: &mut StdRng,
) -> Vec<(f64, f64)> {
    let a = safety_seeking(ctx, start, end, true, rng);
    let b = perimeter(ctx, start, end);

    let mut merged = Vec::with_capacity(a.len() + b.len());
    let longest = a.len().max(b.len());
    for i in 0..longest {
        if i % 2 == 0 {
            if let Some(&p) = a.get(i) {
                merged.push(p);
            } else if let Some(&p) = b.get(i) {
                merged.push(p);
            }
        } else if let Some(&p) = b.get(i) {
            merged.push(p);
        } else if let Some(&p) = a.get(i) {
            merged.push(p);
        }
    }
    merged
}

/// Search a ring of candidate offsets around a point and keep the best
/// candidate only if it is materially safer than the current location.
///
/// The threshold avoids flapping between near-equal cells on noise.
fn improve_locally(
    ctx: &RoutingContext,
    point: (f64, f64),
    candidates: usize,
    radius_m: f64,
) -> (f64, f64) {
    let current_score = ctx.safety_score(point.0, point.1);
    let mut best = point;
    let mut best_score = current_score;

    for k in 0..candidates.max(1) {
        let angle = (k as f64 / candidates.max(1) as f64) * TWO_PI;
        let candidate = offset_by_bearing(point.0, point.1, radius_m, angle);
        let score = ctx.safety_score(candidate.0, candidate.1);
        if score > best_score {
            best = candidate;
            best_score = score;
        }
    }

    if best_score >= current_score + ctx.config.safer_threshold {
        best
    } else {
        point
    }
}

/// Restore the generator contract: `[start, intermediates.., end]` with
/// intermediate progress strictly increasing and strictly inside (0, 1).
fn enforce_progress(
    start: (f64, f64),
    end: (f64, f64),
    intermediates: Vec<(f64, f64)>,
) -> Vec<(f64, f64)> {
    let mut scored: Vec<(f64, (f64, f64))> = intermediates
        .into_iter()
        .filter_map(|p| {
            let t = progress_along(start, end, p)?;
            (t > 1e-6 && t < 1.0 - 1e-6).then_some((t, p))
        })
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut out = Vec::with_capacity(scored.len() + 2);
    out.push(start);
    let mut last_t = 0.0;
    for (t, p) in scored {
        if t > last_t + 1e-6 {
            out.push(p);
            last_t = t;
        }
    }
    out.push(end);
    out
}
