//! The external road-graph source: a directed multigraph of node
//! coordinates and per-edge OSM-style tags, fetched for a bounding box.
//! AERIS does not download road graphs itself; this trait is the seam a
//! real deployment injects an OSM/OSRM-backed implementation through.

use aeris_common::{AerisResult, BoundingBox};
use async_trait::async_trait;

/// One graph node: an external (stable across calls) node id and its
/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawNode {
    pub id: i64,
    pub lon: f64,
    pub lat: f64,
}

/// One directed edge between two external node ids, carrying the subset
/// of OSM way tags the cost model reads. `highway` is the already
/// first-resolved tag value (OSM's list-valued `highway` tag is flattened
/// to its first entry at the source boundary, not here).
#[derive(Debug, Clone, Default)]
pub struct RawEdge {
    pub from: i64,
    pub to: i64,
    pub highway: Option<String>,
    pub maxspeed: Option<String>,
    pub length_m: Option<f64>,
    /// (lon, lat) vertices of the edge geometry, if the source returned one.
    pub geometry: Option<Vec<(f64, f64)>>,
    pub leisure: Option<String>,
    pub cycleway: Option<String>,
    pub access: Option<String>,
}

/// A directed multigraph as returned by the road-graph source, before
/// cost assignment.
#[derive(Debug, Clone, Default)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

impl RawGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.edges.is_empty()
    }
}

/// External collaborator: fetches a directed road graph for a bounding
/// box. Real deployments inject an OSM-backed implementation; this crate
/// depends only on the trait.
#[async_trait]
pub trait RoadGraphSource: Send + Sync {
    async fn fetch(&self, bbox: BoundingBox) -> AerisResult<RawGraph>;
}
