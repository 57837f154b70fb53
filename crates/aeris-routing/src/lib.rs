//! Route graph construction and pathfinding (components G/H of the AERIS
//! exposure platform): builds a pollution-weighted road graph from an
//! externally supplied raw graph and finds the lowest-exposure route(s)
//! between two points.

pub mod cost;
pub mod graph;
pub mod pathfinder;
pub mod source;

pub use cost::{infer_speed_kph, mode_modifier};
pub use graph::{build_weighted_graph, EdgeData, NodeData, RouteGraph, DEFAULT_SAMPLE_STEP_M, FALLBACK_UPES};
pub use pathfinder::{k_shortest_paths, shortest_path, PathResult};
pub use source::{RawEdge, RawGraph, RawNode, RoadGraphSource};
