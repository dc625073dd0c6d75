//! Nearest-transit-edge lookup: an R-tree over every transit edge's
//! geographic midpoint, generalizing `dt_spatial::network`'s
//! `RTree<NodeEntry>` (indexed by node position) into an index over edge
//! midpoints. Built once from the transit mode-graphs and never rebuilt:
//! edges are never inserted or removed at runtime.

use std::collections::HashMap;

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use tg_core::{EdgeId, GeoPoint, Mode};

use crate::store::{midpoint, ModeGraph};

/// One entry in the R-tree: an edge's id, mode, and midpoint.
#[derive(Debug, Clone, Copy)]
struct EdgeEntry {
    mode: Mode,
    edge: EdgeId,
    point: [f64; 2],
}

impl RTreeObject for EdgeEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for EdgeEntry {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// A nearest-edge query result: the matching edge plus its haversine
/// distance from the query point to the edge's midpoint.
#[derive(Debug, Clone)]
pub struct Found {
    pub mode: Mode,
    pub edge: EdgeId,
    pub distance_km: f64,
}

/// Modes excluded from nearest-edge lookup: incidents and client "report
/// a slowdown here" gestures only ever target scheduled transit, never
/// the synthesized walking/bike topology.
fn is_indexable(mode: Mode) -> bool {
    !mode.is_foot_or_bike()
}

pub struct NearestEdgeIndex {
    tree: RTree<EdgeEntry>,
}

impl NearestEdgeIndex {
    /// Index every edge of every non-walking, non-bike mode-graph by its
    /// geographic midpoint.
    pub fn build(graphs: &HashMap<Mode, ModeGraph>) -> Self {
        let mut entries = Vec::new();
        for (&mode, graph) in graphs.iter().filter(|&(&mode, _)| is_indexable(mode)) {
            for i in 0..graph.edges.len() {
                let edge_id = EdgeId(i as u32);
                let edge = graph.edge(edge_id);
                let mid = midpoint(graph.node_pos(edge.source), graph.node_pos(edge.target));
                entries.push(EdgeEntry {
                    mode,
                    edge: edge_id,
                    point: [mid.lat, mid.lon],
                });
            }
        }
        NearestEdgeIndex {
            tree: RTree::bulk_load(entries),
        }
    }

    /// The indexed edge whose midpoint is geographically closest to
    /// `(lat, lon)`, or `None` if no transit edges exist.
    pub fn nearest(&self, lat: f64, lon: f64) -> Option<Found> {
        let query = [lat, lon];
        let entry = self.tree.nearest_neighbor(&query)?;
        let distance_km = crate::store::distance_km(
            GeoPoint { lat, lon },
            GeoPoint {
                lat: entry.point[0],
                lon: entry.point[1],
            },
        );
        Some(Found {
            mode: entry.mode,
            edge: entry.edge,
            distance_km,
        })
    }
}
