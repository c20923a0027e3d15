//! Turns a raw coordinate path into a scored [`Route`].

use std::collections::HashMap;

use crate::context::RoutingContext;
use crate::models::{Grade, Route, RoutePoint, StrategyKind};
use crate::spatial::haversine_distance;

/// Quantization for the per-request incident-count memo, in degrees
/// (~11 m). Counts are pure functions of (coordinate, dataset), so
/// nearby path points can share a lookup.
const MEMO_QUANT_DEG: f64 = 1e-4;

/// Walk a path and produce the final scored route.
///
/// Distance is the haversine sum over consecutive pairs. Safety scores
/// come from the grid (or the neutral constant in degraded mode); the
/// incident counts on the report come from the precise store query, not
/// the coarse grid.
pub fn evaluate_path(
    ctx: &RoutingContext,
    path: &[(f64, f64)],
    strategy: StrategyKind,
    waypoints: Vec<(f64, f64)>,
) -> Route {
    let mut memo: HashMap<(i64, i64), u32> = HashMap::new();
    let mut points = Vec::with_capacity(path.len());
    let mut total_distance = 0.0;
    let mut score_sum = 0.0;
    let mut incident_sum: u32 = 0;

    for (i, &(lat, lng)) in path.iter().enumerate() {
        if i > 0 {
            let (plat, plng) = path[i - 1];
            total_distance += haversine_distance(plat, plng, lat, lng);
        }

        let safety_score = ctx.safety_score(lat, lng);
        let incident_count = nearby_memoized(ctx, &mut memo, lat, lng);

        score_sum += safety_score;
        incident_sum = incident_sum.saturating_add(incident_count);

        points.push(RoutePoint {
            lat,
            lng,
            safety_score,
            incident_count,
            distance_from_start: total_distance,
        });
    }

    let avg_safety_score = if points.is_empty() {
        0.0
    } else {
        score_sum / points.len() as f64
    };

    Route {
        points,
        total_distance_m: total_distance,
        avg_safety_score,
        total_incidents: incident_sum,
        safety_grade: Grade::from_score(avg_safety_score),
        strategy,
        waypoints,
        exceeds_distance_cap: false,
    }
}

fn nearby_memoized(
    ctx: &RoutingContext,
    memo: &mut HashMap<(i64, i64), u32>,
    lat: f64,
    lng: f64,
) -> u32 {
    let key = (
        (lat / MEMO_QUANT_DEG).round() as i64,
        (lng / MEMO_QUANT_DEG).round() as i64,
    );
    *memo.entry(key).or_insert_with(|| {
        ctx.incidents
            .nearby_count(lat, lng, ctx.config.nearby_radius_m)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::incidents::IncidentStore;
    use crate::models::{IncidentCategory, IncidentRecord};
    use std::sync::Arc;

    fn context() -> RoutingContext {
        let records = (0..8).map(|_| {
            IncidentRecord::new(
                37.79,
                -122.44,
                IncidentCategory::Theft,
                "2025-06-01T13:00:00Z".parse().unwrap(),
            )
        });
        RoutingContext::for_request(
            Arc::new(IncidentStore::from_records(records)),
            None,
            RouterConfig::default(),
            (37.7694, -122.4862),
            (37.8087, -122.4098),
        )
    }

    #[test]
    fn distances_accumulate_monotonically() {
        let ctx = context();
        let path = vec![
            (37.7694, -122.4862),
            (37.78, -122.46),
            (37.79, -122.44),
            (37.8087, -122.4098),
        ];
        let route = evaluate_path(&ctx, &path, StrategyKind::Balanced, vec![]);

        assert_eq!(route.points.len(), 4);
        assert_eq!(route.points[0].distance_from_start, 0.0);
        for pair in route.points.windows(2) {
            assert!(pair[1].distance_from_start > pair[0].distance_from_start);
        }
        assert!(
            (route.points.last().unwrap().distance_from_start - route.total_distance_m).abs()
                < 1e-9
        );
    }

    #[test]
    fn zero_length_path_scores_the_start_cell() {
        let ctx = context();
        let p = (37.7694, -122.4862);
        let route = evaluate_path(&ctx, &[p, p], StrategyKind::Direct, vec![p, p]);

        assert_eq!(route.total_distance_m, 0.0);
        assert_eq!(route.avg_safety_score, ctx.safety_score(p.0, p.1));
    }

    #[test]
    fn incident_counts_come_from_the_store_not_the_grid() {
        let ctx = context();
        let route = evaluate_path(
            &ctx,
            &[(37.79, -122.44), (37.7905, -122.4405)],
            StrategyKind::Direct,
            vec![],
        );
        // All eight incidents sit within the report radius of the first
        // point.
        assert_eq!(route.points[0].incident_count, 8);
        assert!(route.total_incidents >= 8);
    }

    #[test]
    fn grade_matches_average_score() {
        let ctx = context();
        let path = vec![(37.77, -122.47), (37.775, -122.465)];
        let route = evaluate_path(&ctx, &path, StrategyKind::Direct, vec![]);
        assert_eq!(route.safety_grade, Grade::from_score(route.avg_safety_score));
    }
}
