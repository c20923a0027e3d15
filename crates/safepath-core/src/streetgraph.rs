//! Optional street-network capability.
//!
//! The engine never acquires street data itself; it consumes a
//! pre-built node/edge network (for example exported from OSM tooling)
//! and treats its absence as a normal, degraded mode.

use std::io::Read;

use petgraph::graph::{NodeIndex, UnGraph};
use serde::Deserialize;

use crate::error::RouteError;
use crate::spatial::haversine_distance;

/// A street intersection or shape point.
#[derive(Debug, Clone, Copy)]
pub struct StreetNode {
    pub lat: f64,
    pub lng: f64,
}

/// A walkable segment between two nodes.
#[derive(Debug, Clone, Copy)]
pub struct StreetEdge {
    pub length_m: f64,
}

#[derive(Debug, Deserialize)]
struct GraphFileNode {
    id: u64,
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GraphFileEdge {
    from: u64,
    to: u64,
    #[serde(default)]
    length_m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GraphFile {
    nodes: Vec<GraphFileNode>,
    edges: Vec<GraphFileEdge>,
}

/// In-memory undirected street graph.
///
/// Read-only after load; shared across concurrent searches by `Arc`.
pub struct StreetGraph {
    graph: UnGraph<StreetNode, StreetEdge>,
}

impl StreetGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraph::new_undirected(),
        }
    }

    /// Load from the JSON interchange format:
    /// `{"nodes": [{"id", "lat", "lng"}], "edges": [{"from", "to", "length_m"?}]}`.
    ///
    /// Missing edge lengths fall back to the haversine distance between
    /// the endpoints. Edges referencing unknown node ids are an error.
    pub fn from_json_reader(reader: impl Read) -> Result<Self, RouteError> {
        let file: GraphFile = serde_json::from_reader(reader)
            .map_err(|e| RouteError::GraphUnavailable(format!("malformed graph file: {e}")))?;

        let mut graph = UnGraph::with_capacity(file.nodes.len(), file.edges.len());
        let mut index = std::collections::HashMap::with_capacity(file.nodes.len());

        for node in &file.nodes {
            let idx = graph.add_node(StreetNode {
                lat: node.lat,
                lng: node.lng,
            });
            index.insert(node.id, idx);
        }

        for edge in &file.edges {
            let (Some(&a), Some(&b)) = (index.get(&edge.from), index.get(&edge.to)) else {
                return Err(RouteError::GraphUnavailable(format!(
                    "edge references unknown node ({} -> {})",
                    edge.from, edge.to
                )));
            };
            let na = graph[a];
            let nb = graph[b];
            let length_m = edge
                .length_m
                .unwrap_or_else(|| haversine_distance(na.lat, na.lng, nb.lat, nb.lng));
            graph.add_edge(a, b, StreetEdge { length_m });
        }

        tracing::info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "street graph loaded"
        );

        Ok(Self { graph })
    }

    pub fn from_json_str(json: &str) -> Result<Self, RouteError> {
        Self::from_json_reader(json.as_bytes())
    }

    /// Nearest graph node to a coordinate, by haversine distance.
    pub fn nearest_node(&self, lat: f64, lng: f64) -> Option<NodeIndex> {
        self.graph.node_indices().min_by(|&a, &b| {
            let na = self.graph[a];
            let nb = self.graph[b];
            let da = haversine_distance(na.lat, na.lng, lat, lng);
            let db = haversine_distance(nb.lat, nb.lng, lat, lng);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn node_coords(&self, idx: NodeIndex) -> (f64, f64) {
        let node = self.graph[idx];
        (node.lat, node.lng)
    }

    pub fn graph(&self) -> &UnGraph<StreetNode, StreetEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

impl Default for StreetGraph {
    fn default() -> Self {
        Self::new()
    }
}
