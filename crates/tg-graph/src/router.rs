//! Shortest-path routing and incident-aware rerouting, generalizing
//! `dt_spatial::router`'s binary-heap Dijkstra from a single `u32`
//! millisecond cost array to the multigraph's per-edge `(weight,
//! default_weight)` pair, run twice: once to find the scheduled path,
//! once (only if impacted) to find an alternative over the graph with
//! every impacted edge removed.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use tg_core::{EdgeId, NodeId};

use crate::error::{GraphError, GraphResult};
use crate::schema::{PathPlan, RoutePlan, RouteSegment};
use crate::store::ModeGraph;

/// A finite, non-negative cost. Edge weights are always positive and
/// finite (enforced at mutation time in `store::resolve_weight`), so
/// `total_cmp` gives a total order without needing a fallible `Ord`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Dijkstra over `graph` from `source` to `target`, using `default_weight`
/// as edge cost and skipping any edge whose id is in `excluded`. Returns
/// the visited node sequence and the chosen edge per hop.
fn shortest_path(
    graph: &ModeGraph,
    source: NodeId,
    target: NodeId,
    excluded: Option<&HashSet<EdgeId>>,
) -> Option<(Vec<NodeId>, Vec<EdgeId>)> {
    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut prev_edge: Vec<Option<EdgeId>> = vec![None; n];

    dist[source.index()] = 0.0;
    let mut heap = BinaryHeap::new();
    heap.push(Reverse((Cost(0.0), source)));

    while let Some(Reverse((Cost(cost), node))) = heap.pop() {
        if node == target {
            break;
        }
        if cost > dist[node.index()] {
            continue;
        }
        for edge_id in graph.out_edges(node) {
            if excluded.is_some_and(|ex| ex.contains(&edge_id)) {
                continue;
            }
            let edge = graph.edge(edge_id);
            let new_cost = cost + edge.default_weight;
            if new_cost < dist[edge.target.index()] {
                dist[edge.target.index()] = new_cost;
                prev_edge[edge.target.index()] = Some(edge_id);
                heap.push(Reverse((Cost(new_cost), edge.target)));
            }
        }
    }

    if dist[target.index()].is_infinite() {
        return None;
    }

    let mut edges = Vec::new();
    let mut nodes = vec![target];
    let mut cur = target;
    while cur != source {
        let edge_id = prev_edge[cur.index()]?;
        edges.push(edge_id);
        cur = graph.edge(edge_id).source;
        nodes.push(cur);
    }
    edges.reverse();
    nodes.reverse();
    Some((nodes, edges))
}

/// Among parallel edges sharing `(source, target)`, the one with minimum
/// `default_weight`, per the router's tie-breaking rule.
fn cheapest_parallel_edge(graph: &ModeGraph, source: NodeId, target: NodeId) -> EdgeId {
    graph
        .out_edges(source)
        .filter(|&e| graph.edge(e).target == target)
        .min_by(|&a, &b| {
            graph.edge(a).default_weight.total_cmp(&graph.edge(b).default_weight)
        })
        .expect("edge exists: node was reached via this exact edge during the search")
}

fn materialize(graph: &ModeGraph, nodes: &[NodeId], edges: &[EdgeId]) -> PathPlan {
    let mut total_default_weight = 0.0;
    let mut total_current_weight = 0.0;
    let segments = edges
        .iter()
        .map(|&edge_id| {
            let edge = graph.edge(edge_id);
            total_default_weight += edge.default_weight;
            total_current_weight += edge.weight;
            RouteSegment {
                source: graph.node_id_str(edge.source).to_string(),
                target: graph.node_id_str(edge.target).to_string(),
                key: edge.key.clone(),
                default_weight: edge.default_weight,
                current_weight: edge.weight,
                impacted: edge.is_impacted(),
                route_short_name: edge.route_short_name.clone(),
                route_long_name: edge.route_long_name.clone(),
            }
        })
        .collect();
    PathPlan {
        nodes: nodes.iter().map(|&n| graph.node_id_str(n).to_string()).collect(),
        segments,
        total_default_weight,
        total_current_weight,
    }
}

/// Implements the algorithm of `plan_route`: find the scheduled path, and
/// when any of its segments is impacted, an alternative over the graph
/// with every impacted edge removed.
pub fn plan_route(graph: &ModeGraph, source: &str, target: &str) -> GraphResult<RoutePlan> {
    let source_id = graph
        .find_node(source)
        .ok_or_else(|| GraphError::BadRequest(format!("unknown source node {source}")))?;
    let target_id = graph
        .find_node(target)
        .ok_or_else(|| GraphError::BadRequest(format!("unknown target node {target}")))?;

    let (default_nodes, path_edges) = shortest_path(graph, source_id, target_id, None).ok_or(
        GraphError::NoPath {
            mode: graph.mode(),
            from: source.to_string(),
            target: target.to_string(),
        },
    )?;

    // Re-resolve each hop to the cheapest parallel edge, per step 3.
    let default_edges: Vec<EdgeId> = default_nodes
        .windows(2)
        .map(|pair| cheapest_parallel_edge(graph, pair[0], pair[1]))
        .collect();
    debug_assert_eq!(default_edges.len(), path_edges.len());

    let default_path = materialize(graph, &default_nodes, &default_edges);
    let incident_detected = default_path.segments.iter().any(|s| s.impacted);

    let suggested_path = if incident_detected {
        let excluded: HashSet<EdgeId> = (0..graph.edges.len())
            .map(|i| EdgeId(i as u32))
            .filter(|&e| graph.edge(e).is_impacted())
            .collect();
        shortest_path(graph, source_id, target_id, Some(&excluded)).and_then(
            |(alt_nodes, alt_path_edges)| {
                if alt_nodes == default_nodes {
                    return None;
                }
                let alt_edges: Vec<EdgeId> = alt_nodes
                    .windows(2)
                    .map(|pair| cheapest_parallel_edge(graph, pair[0], pair[1]))
                    .collect();
                debug_assert_eq!(alt_edges.len(), alt_path_edges.len());
                Some(materialize(graph, &alt_nodes, &alt_edges))
            },
        )
    } else {
        None
    };

    let message = match (incident_detected, &suggested_path) {
        (false, _) => "No active incidents affect this route.".to_string(),
        (true, Some(_)) => {
            "One or more segments are impacted by an active incident; an alternative route is suggested.".to_string()
        }
        (true, None) => {
            "One or more segments are impacted by an active incident, but no unaffected alternative exists.".to_string()
        }
    };

    Ok(RoutePlan {
        incident_detected,
        default_path,
        suggested_path,
        message,
    })
}
