//! Weighted shortest-path search.
//!
//! Two modes: Dijkstra over a small complete waypoint graph, and A*
//! over an external street graph. Both are deterministic for identical
//! inputs; any exploratory randomness lives in waypoint generation.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use petgraph::algo::astar;
use petgraph::visit::EdgeRef;

use crate::context::RoutingContext;
use crate::cost::{street_edge_factor, WaypointCostMatrix};
use crate::error::RouteError;
use crate::spatial::haversine_distance;
use crate::streetgraph::StreetGraph;

/// Total-ordered f64 wrapper for heap keys.
#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Per-node label: combined cost first, then the tie-breakers required
/// of the search — fewer hops, then lower raw distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Label {
    cost: FloatOrd,
    hops: u32,
    distance: FloatOrd,
}

impl Label {
    const INF: Label = Label {
        cost: FloatOrd(f64::INFINITY),
        hops: u32::MAX,
        distance: FloatOrd(f64::INFINITY),
    };
}

/// Dijkstra from `from` to `to` over the complete waypoint graph.
///
/// Returns the node indices of the best path. The graph is complete,
/// so a path always exists for `n >= 2`.
pub fn shortest_waypoint_path(matrix: &WaypointCostMatrix, from: usize, to: usize) -> Vec<usize> {
    let n = matrix.len();
    if from == to || n < 2 {
        return vec![from];
    }

    let mut best = vec![Label::INF; n];
    let mut prev = vec![usize::MAX; n];
    let mut done = vec![false; n];
    let mut heap: BinaryHeap<Reverse<(Label, usize)>> = BinaryHeap::new();

    best[from] = Label {
        cost: FloatOrd(0.0),
        hops: 0,
        distance: FloatOrd(0.0),
    };
    heap.push(Reverse((best[from], from)));

    while let Some(Reverse((label, node))) = heap.pop() {
        if done[node] {
            continue;
        }
        if label > best[node] {
            continue;
        }
        done[node] = true;
        if node == to {
            break;
        }

        for next in 0..n {
            if next == node || done[next] {
                continue;
            }
            let candidate = Label {
                cost: FloatOrd(label.cost.0 + matrix.cost(node, next)),
                hops: label.hops + 1,
                distance: FloatOrd(label.distance.0 + matrix.distance(node, next)),
            };
            if candidate < best[next] {
                best[next] = candidate;
                prev[next] = node;
                heap.push(Reverse((candidate, next)));
            }
        }
    }

    let mut path = Vec::new();
    let mut node = to;
    while node != usize::MAX {
        path.push(node);
        if node == from {
            break;
        }
        node = prev[node];
    }
    path.reverse();
    path
}

/// A* over the street graph between the nodes nearest to start and end.
///
/// The returned coordinate path is wrapped with the exact requested
/// endpoints so the route invariant holds even though the search runs
/// node-to-node.
pub fn shortest_street_path(
    ctx: &RoutingContext,
    graph: &StreetGraph,
    start: (f64, f64),
    end: (f64, f64),
    safety_weight: f64,
) -> Result<Vec<(f64, f64)>, RouteError> {
    let from = graph
        .nearest_node(start.0, start.1)
        .ok_or_else(|| RouteError::GraphUnavailable("street graph has no nodes".into()))?;
    let to = graph
        .nearest_node(end.0, end.1)
        .ok_or_else(|| RouteError::GraphUnavailable("street graph has no nodes".into()))?;

    let goal = graph.node_coords(to);

    let result = astar(
        graph.graph(),
        from,
        |node| node == to,
        |edge| {
            let (alat, alng) = graph.node_coords(edge.source());
            let (blat, blng) = graph.node_coords(edge.target());
            let factor =
                street_edge_factor(ctx, safety_weight, (alat + blat) / 2.0, (alng + blng) / 2.0);
            edge.weight().length_m * factor
        },
        |node| {
            let (lat, lng) = graph.node_coords(node);
            haversine_distance(lat, lng, goal.0, goal.1)
        },
    );

    let Some((_, nodes)) = result else {
        return Err(RouteError::NoPath(format!(
            "no street path between nodes {} and {}",
            from.index(),
            to.index()
        )));
    };

    let mut path = Vec::with_capacity(nodes.len() + 2);
    path.push(start);
    for node in nodes {
        let coords = graph.node_coords(node);
        if path.last() != Some(&coords) {
            path.push(coords);
        }
    }
    if path.last() != Some(&end) {
        path.push(end);
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouterConfig;
    use crate::incidents::IncidentStore;
    use crate::models::{IncidentCategory, IncidentRecord};
    use std::sync::Arc;

    const START: (f64, f64) = (37.7694, -122.4862);
    const END: (f64, f64) = (37.8087, -122.4098);

    fn neutral_context() -> RoutingContext {
        RoutingContext::new(
            Arc::new(IncidentStore::default()),
            None,
            None,
            RouterConfig::default(),
        )
    }

    fn clustered_context() -> RoutingContext {
        let records = (0..20).map(|_| {
            IncidentRecord::new(
                37.789,
                -122.448,
                IncidentCategory::Robbery,
                "2025-06-01T23:30:00Z".parse().unwrap(),
            )
        });
        RoutingContext::for_request(
            Arc::new(IncidentStore::from_records(records)),
            None,
            RouterConfig::default(),
            START,
            END,
        )
    }

    #[test]
    fn dijkstra_prefers_direct_hop_when_distance_dominates() {
        let ctx = neutral_context();
        let points = vec![START, (37.79, -122.45), END];
        let matrix = WaypointCostMatrix::build(&ctx, &points, 0.0);
        let path = shortest_waypoint_path(&matrix, 0, 2);
        // With uniform safety and w=0 the direct hop is strictly
        // shortest.
        assert_eq!(path, vec![0, 2]);
    }

    #[test]
    fn dijkstra_detours_around_bad_cells_at_high_weight() {
        let ctx = clustered_context();
        let points = vec![
            START,
            (37.789, -122.448), // inside the cluster
            (37.8, -122.46),    // clean detour
            END,
        ];
        let matrix = WaypointCostMatrix::build(&ctx, &points, 0.95);
        let path = shortest_waypoint_path(&matrix, 0, 3);
        assert!(
            !path.contains(&1),
            "high-weight path went through the cluster: {path:?}"
        );
    }

    #[test]
    fn dijkstra_is_deterministic() {
        let ctx = clustered_context();
        let points = vec![START, (37.78, -122.47), (37.79, -122.43), END];
        let matrix = WaypointCostMatrix::build(&ctx, &points, 0.6);
        let a = shortest_waypoint_path(&matrix, 0, 3);
        let b = shortest_waypoint_path(&matrix, 0, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn street_path_connects_and_wraps_endpoints() {
        let ctx = neutral_context();
        let graph = StreetGraph::from_json_str(
            r#"{
                "nodes": [
                    {"id": 1, "lat": 37.7695, "lng": -122.4860},
                    {"id": 2, "lat": 37.7800, "lng": -122.4500},
                    {"id": 3, "lat": 37.8085, "lng": -122.4100}
                ],
                "edges": [
                    {"from": 1, "to": 2},
                    {"from": 2, "to": 3}
                ]
            }"#,
        )
        .unwrap();

        let path = shortest_street_path(&ctx, &graph, START, END, 0.5).unwrap();
        assert_eq!(path[0], START);
        assert_eq!(*path.last().unwrap(), END);
        assert!(path.len() >= 4);
    }

    #[test]
    fn disconnected_street_graph_is_no_path() {
        let ctx = neutral_context();
        let graph = StreetGraph::from_json_str(
            r#"{
                "nodes": [
                    {"id": 1, "lat": 37.7695, "lng": -122.4860},
                    {"id": 2, "lat": 37.8085, "lng": -122.4100}
                ],
                "edges": []
            }"#,
        )
        .unwrap();

        let err = shortest_street_path(&ctx, &graph, START, END, 0.5).unwrap_err();
        assert!(matches!(err, RouteError::NoPath(_)));
    }
}
