//! Route graph builder (component G): assembles a petgraph directed
//! multigraph whose edges carry `weight`/`length_m`/`mean_upes`/`time_h`,
//! sampled from the latest UPES raster and mode-shaped by travel mode.

use crate::cost::{infer_speed_kph, mode_modifier};
use crate::source::{RawEdge, RawGraph};
use aeris_common::geo::haversine_m;
use aeris_common::{AerisResult, Mode};
use aeris_raster::sample_upes_along_line;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::path::Path;
use tracing::instrument;

/// Default UPES sampling step along an edge's geometry, meters.
pub const DEFAULT_SAMPLE_STEP_M: f64 = 50.0;
/// Mean UPES used when the raster is missing or no sample along the edge
/// is valid.
pub const FALLBACK_UPES: f64 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct NodeData {
    pub external_id: i64,
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeData {
    pub weight: f64,
    pub length_m: f64,
    pub mean_upes: f64,
    pub time_h: f64,
}

/// A directed multigraph ready for pathfinding: `petgraph::DiGraph` keyed
/// by the road-graph source's external node ids.
pub struct RouteGraph {
    pub graph: DiGraph<NodeData, EdgeData>,
    index_by_external_id: HashMap<i64, NodeIndex>,
}

impl RouteGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0 || self.graph.edge_count() == 0
    }

    /// Nearest node to `(lon, lat)` by straight haversine distance, or
    /// `None` for an empty graph.
    pub fn nearest_node(&self, lon: f64, lat: f64) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .min_by(|&a, &b| {
                let da = haversine_m(lon, lat, self.graph[a].lon, self.graph[a].lat);
                let db = haversine_m(lon, lat, self.graph[b].lon, self.graph[b].lat);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

fn edge_coords(edge: &RawEdge, nodes: &HashMap<i64, (f64, f64)>) -> Vec<(f64, f64)> {
    if let Some(geom) = &edge.geometry {
        if !geom.is_empty() {
            return geom.clone();
        }
    }
    match (nodes.get(&edge.from), nodes.get(&edge.to)) {
        (Some(&from), Some(&to)) => vec![from, to],
        _ => Vec::new(),
    }
}

fn geometry_length_m(coords: &[(f64, f64)]) -> f64 {
    coords
        .windows(2)
        .map(|pair| haversine_m(pair[0].0, pair[0].1, pair[1].0, pair[1].1))
        .sum()
}

/// Build a weighted route graph from the raw road graph, sampling the
/// latest UPES raster (if any) along each edge and applying the mode's
/// (alpha, beta, gamma) weights and modifier rules.
#[instrument(skip(raw), fields(mode = ?mode, nodes = raw.nodes.len(), edges = raw.edges.len()))]
pub fn build_weighted_graph(
    raw: &RawGraph,
    mode: Mode,
    raster_path: Option<&Path>,
    sample_step_m: f64,
) -> AerisResult<RouteGraph> {
    let mut graph = DiGraph::new();
    let mut index_by_external_id = HashMap::new();
    let mut coord_by_id = HashMap::new();

    for node in &raw.nodes {
        let idx = graph.add_node(NodeData {
            external_id: node.id,
            lon: node.lon,
            lat: node.lat,
        });
        index_by_external_id.insert(node.id, idx);
        coord_by_id.insert(node.id, (node.lon, node.lat));
    }

    let (alpha, beta, gamma) = mode.weights();

    for edge in &raw.edges {
        let (Some(&u), Some(&v)) = (
            index_by_external_id.get(&edge.from),
            index_by_external_id.get(&edge.to),
        ) else {
            continue;
        };

        let coords = edge_coords(edge, &coord_by_id);
        let mean_upes = if coords.is_empty() {
            FALLBACK_UPES
        } else {
            sample_upes_along_line(raster_path, &coords, sample_step_m, FALLBACK_UPES)?
        };

        let length_m = edge.length_m.filter(|l| *l > 0.0).unwrap_or_else(|| {
            let geom_len = geometry_length_m(&coords);
            if geom_len > 0.0 {
                geom_len
            } else {
                1.0
            }
        });
        let distance_km = length_m / 1000.0;
        let speed_kph = infer_speed_kph(edge);
        let time_h = distance_km / speed_kph.max(5.0);

        let cost = alpha * mean_upes + beta * distance_km + gamma * time_h;
        let weight = mode_modifier(edge, mode) * cost;

        graph.add_edge(
            u,
            v,
            EdgeData {
                weight,
                length_m,
                mean_upes,
                time_h,
            },
        );
    }

    Ok(RouteGraph {
        graph,
        index_by_external_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawNode;

    fn diamond_raw() -> RawGraph {
        RawGraph {
            nodes: vec![
                RawNode { id: 1, lon: 0.0, lat: 0.0 },
                RawNode { id: 2, lon: 1.0, lat: 0.0 },
                RawNode { id: 3, lon: 2.0, lat: 0.0 },
                RawNode { id: 4, lon: 1.0, lat: 1.0 },
            ],
            edges: vec![
                RawEdge { from: 1, to: 2, length_m: Some(1000.0), highway: Some("residential".into()), ..Default::default() },
                RawEdge { from: 2, to: 3, length_m: Some(1000.0), highway: Some("residential".into()), ..Default::default() },
                RawEdge { from: 1, to: 4, length_m: Some(1000.0), highway: Some("residential".into()), ..Default::default() },
                RawEdge { from: 4, to: 3, length_m: Some(1000.0), highway: Some("residential".into()), ..Default::default() },
            ],
        }
    }

    #[test]
    fn builds_expected_node_and_edge_counts() {
        let raw = diamond_raw();
        let rg = build_weighted_graph(&raw, Mode::Commute, None, DEFAULT_SAMPLE_STEP_M).unwrap();
        assert_eq!(rg.node_count(), 4);
        assert_eq!(rg.edge_count(), 4);
    }

    #[test]
    fn missing_raster_uses_fallback_upes_on_every_edge() {
        let raw = diamond_raw();
        let rg = build_weighted_graph(&raw, Mode::Commute, None, DEFAULT_SAMPLE_STEP_M).unwrap();
        for e in rg.graph.edge_weights() {
            assert_eq!(e.mean_upes, FALLBACK_UPES);
        }
    }

    #[test]
    fn nearest_node_snaps_to_closest_coordinate() {
        let raw = diamond_raw();
        let rg = build_weighted_graph(&raw, Mode::Commute, None, DEFAULT_SAMPLE_STEP_M).unwrap();
        let idx = rg.nearest_node(0.01, 0.01).unwrap();
        assert_eq!(rg.graph[idx].external_id, 1);
    }

    #[test]
    fn edge_modifier_in_range_yields_bounded_weight() {
        let raw = diamond_raw();
        let rg = build_weighted_graph(&raw, Mode::Jog, None, DEFAULT_SAMPLE_STEP_M).unwrap();
        for e in rg.graph.edge_weights() {
            assert!(e.weight >= 0.0);
        }
    }
}
