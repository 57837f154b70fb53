//! Pathfinder (component H): nearest-node snapping, shortest path by
//! `weight`, and up to k loopless alternatives in non-decreasing cost
//! order (Yen's algorithm over a parallel-edge-collapsed graph).

use crate::graph::{EdgeData, NodeData, RouteGraph};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

/// One route result: the node path, a deduplicated LineString, and the
/// aggregated exposure/distance/time/cost metrics.
#[derive(Debug, Clone)]
pub struct PathResult {
    pub external_node_ids: Vec<i64>,
    pub coordinates: Vec<(f64, f64)>,
    pub exposure: f64,
    pub distance_km: f64,
    pub time_min: f64,
    pub cost: f64,
}

/// Collapse parallel edges to the minimum-weight edge per `(u, v)`,
/// preserving node identity/order so a Yen's-style search over a simple
/// graph still maps back to the multigraph's node set.
fn collapse_parallel_edges(graph: &DiGraph<NodeData, EdgeData>) -> DiGraph<NodeData, EdgeData> {
    let mut collapsed = DiGraph::with_capacity(graph.node_count(), graph.edge_count());
    for idx in graph.node_indices() {
        let added = collapsed.add_node(graph[idx]);
        debug_assert_eq!(added, idx);
    }
    let mut best: HashMap<(NodeIndex, NodeIndex), EdgeData> = HashMap::new();
    for edge in graph.edge_references() {
        let key = (edge.source(), edge.target());
        best.entry(key)
            .and_modify(|cur| {
                if edge.weight().weight < cur.weight {
                    *cur = *edge.weight();
                }
            })
            .or_insert(*edge.weight());
    }
    for ((u, v), data) in best {
        collapsed.add_edge(u, v, data);
    }
    collapsed
}

#[derive(PartialEq)]
struct HeapState {
    cost: f64,
    node: NodeIndex,
}
impl Eq for HeapState {}
impl Ord for HeapState {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed so `BinaryHeap` (a max-heap) pops the smallest cost first
        other.cost.partial_cmp(&self.cost).unwrap_or(Ordering::Equal)
    }
}
impl PartialOrd for HeapState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra over `graph`, skipping any node in `blocked_nodes` and any
/// edge in `blocked_edges`. Returns the node path (inclusive of `src` and
/// `tgt`) and its total weight, or `None` if unreachable.
fn dijkstra_blocked(
    graph: &DiGraph<NodeData, EdgeData>,
    src: NodeIndex,
    tgt: NodeIndex,
    blocked_edges: &HashSet<(NodeIndex, NodeIndex)>,
    blocked_nodes: &HashSet<NodeIndex>,
) -> Option<(Vec<NodeIndex>, f64)> {
    if src == tgt {
        return Some((vec![src], 0.0));
    }
    if blocked_nodes.contains(&src) || blocked_nodes.contains(&tgt) {
        return None;
    }

    let mut dist: HashMap<NodeIndex, f64> = HashMap::new();
    let mut prev: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut heap = BinaryHeap::new();
    dist.insert(src, 0.0);
    heap.push(HeapState { cost: 0.0, node: src });

    while let Some(HeapState { cost, node }) = heap.pop() {
        if node == tgt {
            break;
        }
        if cost > *dist.get(&node).unwrap_or(&f64::INFINITY) {
            continue;
        }
        for edge in graph.edges(node) {
            let next = edge.target();
            if blocked_nodes.contains(&next) || blocked_edges.contains(&(node, next)) {
                continue;
            }
            let next_cost = cost + edge.weight().weight;
            if next_cost < *dist.get(&next).unwrap_or(&f64::INFINITY) {
                dist.insert(next, next_cost);
                prev.insert(next, node);
                heap.push(HeapState { cost: next_cost, node: next });
            }
        }
    }

    let total = *dist.get(&tgt)?;
    let mut path = vec![tgt];
    let mut cur = tgt;
    while cur != src {
        cur = *prev.get(&cur)?;
        path.push(cur);
    }
    path.reverse();
    Some((path, total))
}

fn path_cost(graph: &DiGraph<NodeData, EdgeData>, path: &[NodeIndex]) -> f64 {
    path.windows(2)
        .filter_map(|w| graph.find_edge(w[0], w[1]).map(|e| graph[e].weight))
        .sum()
}

/// Yen's algorithm: up to `k` loopless paths from `src` to `tgt`, in
/// non-decreasing total-weight order.
fn yen_k_shortest(
    graph: &DiGraph<NodeData, EdgeData>,
    src: NodeIndex,
    tgt: NodeIndex,
    k: usize,
) -> Vec<(Vec<NodeIndex>, f64)> {
    let Some(first) = dijkstra_blocked(graph, src, tgt, &HashSet::new(), &HashSet::new()) else {
        return Vec::new();
    };
    let mut a = vec![first];
    let mut candidates: Vec<(Vec<NodeIndex>, f64)> = Vec::new();

    while a.len() < k {
        let prev_path = a.last().unwrap().0.clone();
        if prev_path.len() < 2 {
            break;
        }
        for i in 0..prev_path.len() - 1 {
            let spur_node = prev_path[i];
            let root_path = &prev_path[..=i];

            let mut blocked_edges = HashSet::new();
            for (path, _) in &a {
                if path.len() > i && path[..=i] == *root_path {
                    blocked_edges.insert((path[i], path[i + 1]));
                }
            }
            let blocked_nodes: HashSet<NodeIndex> = root_path[..root_path.len() - 1].iter().copied().collect();

            if let Some((spur_path, spur_cost)) =
                dijkstra_blocked(graph, spur_node, tgt, &blocked_edges, &blocked_nodes)
            {
                let mut total_path = root_path[..root_path.len() - 1].to_vec();
                total_path.extend(spur_path);
                let total_cost = path_cost(graph, &root_path[..root_path.len() - 1]) + spur_cost;
                let is_new = !a.iter().any(|(p, _)| *p == total_path)
                    && !candidates.iter().any(|(p, _)| *p == total_path);
                if is_new {
                    candidates.push((total_path, total_cost));
                }
            }
        }
        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|x, y| x.1.partial_cmp(&y.1).unwrap_or(Ordering::Equal));
        a.push(candidates.remove(0));
    }

    a.truncate(k);
    a
}

fn dedup_consecutive(coords: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(coords.len());
    for c in coords {
        if out.last() != Some(&c) {
            out.push(c);
        }
    }
    out
}

fn build_path_result(graph: &DiGraph<NodeData, EdgeData>, path: &[NodeIndex], cost: f64) -> PathResult {
    let mut exposure = 0.0;
    let mut distance_km = 0.0;
    let mut time_min = 0.0;
    for w in path.windows(2) {
        if let Some(edge) = graph.find_edge(w[0], w[1]) {
            let data = graph[edge];
            let leg_km = data.length_m / 1000.0;
            exposure += data.mean_upes * leg_km;
            distance_km += leg_km;
            time_min += data.time_h * 60.0;
        }
    }
    let coordinates = dedup_consecutive(path.iter().map(|&idx| (graph[idx].lon, graph[idx].lat)).collect());
    let external_node_ids = path.iter().map(|&idx| graph[idx].external_id).collect();
    PathResult {
        external_node_ids,
        coordinates,
        exposure,
        distance_km,
        time_min,
        cost,
    }
}

/// Snap origin/destination to the nearest graph nodes and return the
/// minimum-`weight` path, or `None` if the graph is empty, snapping
/// fails, or no path exists.
pub fn shortest_path(
    route_graph: &RouteGraph,
    origin: (f64, f64),
    destination: (f64, f64),
) -> Option<PathResult> {
    if route_graph.node_count() == 0 {
        return None;
    }
    let src = route_graph.nearest_node(origin.0, origin.1)?;
    let tgt = route_graph.nearest_node(destination.0, destination.1)?;
    let collapsed = collapse_parallel_edges(&route_graph.graph);
    let (path, cost) = dijkstra_blocked(&collapsed, src, tgt, &HashSet::new(), &HashSet::new())?;
    Some(build_path_result(&collapsed, &path, cost))
}

/// Up to `k` alternative routes in non-decreasing cost order.
pub fn k_shortest_paths(
    route_graph: &RouteGraph,
    origin: (f64, f64),
    destination: (f64, f64),
    k: usize,
) -> Vec<PathResult> {
    if route_graph.node_count() == 0 || k == 0 {
        return Vec::new();
    }
    let Some(src) = route_graph.nearest_node(origin.0, origin.1) else {
        return Vec::new();
    };
    let Some(tgt) = route_graph.nearest_node(destination.0, destination.1) else {
        return Vec::new();
    };
    let collapsed = collapse_parallel_edges(&route_graph.graph);
    yen_k_shortest(&collapsed, src, tgt, k)
        .into_iter()
        .map(|(path, cost)| build_path_result(&collapsed, &path, cost))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_weighted_graph;
    use crate::source::{RawEdge, RawGraph, RawNode};
    use aeris_common::Mode;

    /// Diamond graph where the safest path is 1->4->3 at cost 0.80,
    /// not the shorter but dirtier 1->2->3.
    fn diamond_with_literal_weights() -> DiGraph<NodeData, EdgeData> {
        let mut g = DiGraph::new();
        let n1 = g.add_node(NodeData { external_id: 1, lon: 0.0, lat: 0.0 });
        let n2 = g.add_node(NodeData { external_id: 2, lon: 1.0, lat: 0.0 });
        let n3 = g.add_node(NodeData { external_id: 3, lon: 2.0, lat: 0.0 });
        let n4 = g.add_node(NodeData { external_id: 4, lon: 1.0, lat: 1.0 });
        g.add_edge(n1, n2, EdgeData { weight: 0.4, length_m: 1000.0, mean_upes: 0.4, time_h: 0.1 });
        g.add_edge(n2, n3, EdgeData { weight: 0.5, length_m: 1000.0, mean_upes: 0.5, time_h: 0.1 });
        g.add_edge(n1, n4, EdgeData { weight: 0.35, length_m: 1000.0, mean_upes: 0.35, time_h: 0.1 });
        g.add_edge(n4, n3, EdgeData { weight: 0.45, length_m: 1000.0, mean_upes: 0.45, time_h: 0.1 });
        g
    }

    #[test]
    fn diamond_graph_picks_safest_path() {
        let g = diamond_with_literal_weights();
        let src = NodeIndex::new(0);
        let tgt = NodeIndex::new(2);
        let (path, cost) = dijkstra_blocked(&g, src, tgt, &HashSet::new(), &HashSet::new()).unwrap();
        let ids: Vec<i64> = path.iter().map(|&i| g[i].external_id).collect();
        assert_eq!(ids, vec![1, 4, 3]);
        assert!((cost - 0.80).abs() < 1e-9);
    }

    #[test]
    fn k_shortest_returns_both_diamond_routes_in_order() {
        let g = diamond_with_literal_weights();
        let src = NodeIndex::new(0);
        let tgt = NodeIndex::new(2);
        let paths = yen_k_shortest(&g, src, tgt, 2);
        assert_eq!(paths.len(), 2);
        assert!(paths[0].1 <= paths[1].1);
        let ids0: Vec<i64> = paths[0].0.iter().map(|&i| g[i].external_id).collect();
        assert_eq!(ids0, vec![1, 4, 3]);
    }

    #[test]
    fn empty_graph_returns_none() {
        let raw = RawGraph::default();
        let rg = build_weighted_graph(&raw, Mode::Commute, None, 50.0).unwrap();
        assert!(shortest_path(&rg, (0.0, 0.0), (1.0, 1.0)).is_none());
        assert!(k_shortest_paths(&rg, (0.0, 0.0), (1.0, 1.0), 3).is_empty());
    }

    #[test]
    fn zero_length_route_does_not_crash() {
        let raw = RawGraph {
            nodes: vec![RawNode { id: 1, lon: 0.0, lat: 0.0 }],
            edges: vec![],
        };
        let rg = build_weighted_graph(&raw, Mode::Commute, None, 50.0).unwrap();
        let result = shortest_path(&rg, (0.0, 0.0), (0.0, 0.0));
        let result = result.expect("single node graph should snap to itself");
        assert_eq!(result.distance_km, 0.0);
    }

    #[test]
    fn distance_never_less_than_straight_line() {
        use aeris_common::geo::haversine_m;
        let raw = RawGraph {
            nodes: vec![
                RawNode { id: 1, lon: 0.0, lat: 0.0 },
                RawNode { id: 2, lon: 0.5, lat: 0.5 },
                RawNode { id: 3, lon: 1.0, lat: 1.0 },
            ],
            edges: vec![
                RawEdge { from: 1, to: 2, length_m: Some(78626.0), highway: Some("residential".into()), ..Default::default() },
                RawEdge { from: 2, to: 3, length_m: Some(78626.0), highway: Some("residential".into()), ..Default::default() },
            ],
        };
        let rg = build_weighted_graph(&raw, Mode::Commute, None, 50.0).unwrap();
        let result = shortest_path(&rg, (0.0, 0.0), (1.0, 1.0)).unwrap();
        let straight_km = haversine_m(0.0, 0.0, 1.0, 1.0) / 1000.0;
        assert!(result.distance_km >= straight_km - 1e-6);
        assert!(result.time_min > 0.0);
    }
}
