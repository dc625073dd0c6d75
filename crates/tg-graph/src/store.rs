//! The concurrent graph store: one mode-keyed map of `RwLock`-guarded
//! mode-graphs, the nearest-edge index, and the event bus, generalizing
//! `dt_spatial::network::RoadNetwork`'s single CSR road graph into a
//! mode-keyed collection of mutable multigraphs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tg_core::{haversine_km, EdgeId, GeoPoint, Mode, NodeId};

use crate::builder::{self, BuiltGraphs};
use crate::config::{EngineConfig, EPSILON};
use crate::events::{Event, EventBus, Subscriber};
use crate::model::BikeParking;
use crate::nearest::NearestEdgeIndex;
use crate::router;
use crate::schema::{
    EdgeUpdatedMessage, EdgeView, GraphView, NodeView, RoutePlan, SnapshotMessage,
};
use crate::error::{GraphError, GraphResult};

/// A directed, keyed edge: the same `(source, target)` pair may carry
/// multiple edges distinguished by `key` (a trip id or a synthetic key).
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    pub key: String,
    pub source: NodeId,
    pub target: NodeId,
    pub default_weight: f64,
    pub weight: f64,
    pub distance_km: Option<f64>,
    pub speed_kmh: Option<f64>,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub connector: bool,
}

impl EdgeRecord {
    pub fn is_impacted(&self) -> bool {
        self.weight - self.default_weight > EPSILON
    }
}

/// A single mode's directed multigraph: dense node/edge storage in CSR
/// adjacency form (grounded on `dt_spatial::network::RoadNetwork`), with
/// mutable per-edge weights rather than `RoadNetwork`'s fixed-cost edges.
pub struct ModeGraph {
    pub(crate) mode: Mode,
    pub(crate) stop_ids: Vec<String>,
    pub(crate) stop_index: HashMap<String, NodeId>,
    pub(crate) positions: Vec<GeoPoint>,
    pub(crate) node_out_start: Vec<u32>,
    pub(crate) edges: Vec<EdgeRecord>,
}

impl ModeGraph {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn node_count(&self) -> usize {
        self.stop_ids.len()
    }

    pub fn find_node(&self, stop_id: &str) -> Option<NodeId> {
        self.stop_index.get(stop_id).copied()
    }

    pub fn node_id_str(&self, node: NodeId) -> &str {
        &self.stop_ids[node.index()]
    }

    pub fn node_pos(&self, node: NodeId) -> GeoPoint {
        self.positions[node.index()]
    }

    pub fn edge(&self, edge: EdgeId) -> &EdgeRecord {
        &self.edges[edge.index()]
    }

    /// Outgoing edges of `node`, as a contiguous CSR index range.
    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        let start = self.node_out_start[node.index()] as usize;
        let end = self.node_out_start[node.index() + 1] as usize;
        (start..end).map(|i| EdgeId(i as u32))
    }

    /// Find the first-inserted edge matching `(source, target[, key])`,
    /// per `update_edge`'s deterministic selection rule.
    pub fn find_edge(&self, source: NodeId, target: NodeId, key: Option<&str>) -> Option<EdgeId> {
        self.out_edges(source)
            .filter(|&e| self.edges[e.index()].target == target)
            .find(|&e| key.is_none_or(|k| self.edges[e.index()].key == k))
    }

    pub fn node_view(&self, node: NodeId, bike_accessible: Option<bool>) -> NodeView {
        let id = self.stop_ids[node.index()].clone();
        let pos = self.positions[node.index()];
        NodeView {
            id,
            latitude: Some(pos.lat),
            longitude: Some(pos.lon),
            bike_accessible,
            stop_name: None,
        }
    }

    pub fn edge_view(&self, edge: EdgeId) -> EdgeView {
        edge_record_to_view(self.mode, &self.stop_ids, self.edges[edge.index()].clone())
    }
}

fn edge_record_to_view(mode: Mode, stop_ids: &[String], edge: EdgeRecord) -> EdgeView {
    EdgeView {
        mode,
        source: stop_ids[edge.source.index()].clone(),
        target: stop_ids[edge.target.index()].clone(),
        key: edge.key,
        weight: edge.weight,
        default_weight: Some(edge.default_weight),
        distance_km: edge.distance_km,
        speed_kmh: edge.speed_kmh,
        connector: Some(edge.connector),
        trip_id: edge.trip_id,
        route_id: edge.route_id,
        route_short_name: edge.route_short_name,
        route_long_name: edge.route_long_name,
        context: None,
    }
}

/// The concurrent graph store: all public operations named in the
/// engine's component design live here.
pub struct GraphStore {
    graphs: HashMap<Mode, RwLock<ModeGraph>>,
    /// Built once over the transit mode-graphs' edge topology. Never
    /// rebuilt: edges are never inserted or removed at runtime, so the
    /// qualifying edge set's shape never changes after construction.
    nearest_index: NearestEdgeIndex,
    bike_accessible: RwLock<std::collections::HashSet<String>>,
    bike_topology: builder::WalkTopology,
    event_bus: EventBus,
    config: EngineConfig,
}

impl GraphStore {
    /// Build the store from a loaded GTFS feed and an initial set of bike
    /// parkings (possibly empty; load more later via
    /// [`load_bike_parkings`](Self::load_bike_parkings)).
    pub fn new(
        feed: &tg_gtfs::LoadedFeed,
        bike_parkings: &[BikeParking],
        config: EngineConfig,
    ) -> Self {
        let BuiltGraphs {
            graphs,
            walk_topology,
            bike_accessible,
        } = builder::build_graphs(feed, bike_parkings, &config);

        let nearest_index = NearestEdgeIndex::build(&graphs);

        GraphStore {
            graphs: graphs
                .into_iter()
                .map(|(mode, graph)| (mode, RwLock::new(graph)))
                .collect(),
            nearest_index,
            bike_accessible: RwLock::new(bike_accessible),
            bike_topology: walk_topology,
            event_bus: EventBus::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sorted list of modes this store has a graph for.
    pub fn available_modes(&self) -> Vec<Mode> {
        let mut modes: Vec<Mode> = self.graphs.keys().copied().collect();
        modes.sort_by_key(|m| m.label());
        modes
    }

    fn graph(&self, mode: Mode) -> GraphResult<&RwLock<ModeGraph>> {
        self.graphs.get(&mode).ok_or(GraphError::UnknownMode(mode))
    }

    /// Rebuild the bike graph from the given parking locations and
    /// broadcast a full snapshot. `radius_m` defaults to the configured
    /// `bike_access_radius_m` when `None`.
    pub fn load_bike_parkings(&self, locations: &[BikeParking], radius_m: Option<f64>) {
        let radius = radius_m.unwrap_or(self.config.bike_access_radius_m);
        let (bike_graph, accessible) =
            builder::build_bike_graph(&self.bike_topology, locations, radius, &self.config);

        if let Some(lock) = self.graphs.get(&Mode::Bike) {
            *lock.write().unwrap() = bike_graph;
        }
        *self.bike_accessible.write().unwrap() = accessible;

        self.event_bus
            .publish(Event::Snapshot(Arc::new(self.snapshot(None))));
    }

    /// Resolve `(mode, source, target, key?, weight?, speed_kmh?)` to a
    /// single edge mutation and broadcast the post-image.
    #[allow(clippy::too_many_arguments)]
    pub fn update_edge(
        &self,
        mode: Mode,
        source: &str,
        target: &str,
        key: Option<&str>,
        weight: Option<f64>,
        speed_kmh: Option<f64>,
        context: Option<serde_json::Value>,
    ) -> GraphResult<EdgeView> {
        let lock = self.graph(mode)?;

        let view = {
            let mut graph = lock.write().unwrap();
            let unknown = || GraphError::UnknownEdge {
                from: source.to_string(),
                target: target.to_string(),
                key: key.map(str::to_string),
            };
            let source_id = graph.find_node(source).ok_or_else(unknown)?;
            let target_id = graph.find_node(target).ok_or_else(unknown)?;
            let edge_id = graph.find_edge(source_id, target_id, key).ok_or_else(|| {
                log::debug!("update_edge rejected: no edge matching {mode:?} {source}->{target} (key={key:?})");
                unknown()
            })?;

            let resolved_weight = resolve_weight(graph.edge(edge_id), weight, speed_kmh).inspect_err(|err| {
                log::debug!("update_edge rejected: {err}");
            })?;

            let edge = &mut graph.edges[edge_id.index()];
            edge.weight = resolved_weight;
            if speed_kmh.is_some() && weight.is_none() {
                edge.speed_kmh = speed_kmh;
            }

            let mut view = graph.edge_view(edge_id);
            view.context = context.clone();
            view
        };

        self.event_bus.publish(Event::EdgeUpdated(Arc::new(EdgeUpdatedMessage {
            edge: view.clone(),
        })));
        Ok(view)
    }

    /// `get_closest_transit_edge` + `update_edge` composed.
    pub fn update_closest_transit_edge(
        &self,
        lat: f64,
        lon: f64,
        weight: f64,
    ) -> GraphResult<EdgeView> {
        let found = self.get_closest_transit_edge(lat, lon)?;
        self.update_edge(
            found.mode,
            &found.source,
            &found.target,
            Some(&found.key),
            Some(weight),
            None,
            None,
        )
    }

    /// Nearest transit edge (excluding `walking`/`bike`) to `(lat, lon)`,
    /// by haversine distance to the edge's geographic midpoint.
    pub fn get_closest_transit_edge(&self, lat: f64, lon: f64) -> GraphResult<EdgeView> {
        let found = self
            .nearest_index
            .nearest(lat, lon)
            .ok_or(GraphError::NoTransitEdges)?;
        let graph = self.graph(found.mode)?.read().unwrap();
        let mut view = graph.edge_view(found.edge);
        view.context = Some(serde_json::json!({ "distance_to_point_km": found.distance_km }));
        Ok(view)
    }

    /// Look up a single edge by its full key, without mutating it. Used
    /// by the incident impact loop to capture an edge's baseline weight
    /// the first time it becomes impacted.
    pub fn get_edge(&self, mode: Mode, source: &str, target: &str, key: &str) -> GraphResult<EdgeView> {
        let graph = self.graph(mode)?.read().unwrap();
        let unknown = || GraphError::UnknownEdge {
            from: source.to_string(),
            target: target.to_string(),
            key: Some(key.to_string()),
        };
        let source_id = graph.find_node(source).ok_or_else(unknown)?;
        let target_id = graph.find_node(target).ok_or_else(unknown)?;
        let edge_id = graph
            .find_edge(source_id, target_id, Some(key))
            .ok_or_else(unknown)?;
        Ok(graph.edge_view(edge_id))
    }

    pub fn plan_route(&self, mode: Mode, source: &str, target: &str) -> GraphResult<RoutePlan> {
        let graph = self.graph(mode)?.read().unwrap();
        router::plan_route(&graph, source, target)
    }

    /// Serialize one mode's graph, or every mode's graph when `mode` is
    /// `None`.
    pub fn snapshot(&self, mode: Option<Mode>) -> SnapshotMessage {
        let modes: Vec<Mode> = match mode {
            Some(m) => vec![m],
            None => self.available_modes(),
        };
        let bike_accessible = self.bike_accessible.read().unwrap();
        let graphs = modes
            .into_iter()
            .filter_map(|mode| self.graphs.get(&mode))
            .map(|lock| {
                let graph = lock.read().unwrap();
                let nodes = (0..graph.node_count())
                    .map(|i| {
                        let node = NodeId(i as u32);
                        graph.node_view(node, Some(bike_accessible.contains(graph.node_id_str(node))))
                    })
                    .collect();
                let edges = (0..graph.edges.len())
                    .map(|i| graph.edge_view(EdgeId(i as u32)))
                    .collect();
                GraphView {
                    mode: graph.mode(),
                    nodes,
                    edges,
                }
            })
            .collect();
        SnapshotMessage { graphs }
    }

    /// Register a new subscriber, seeding its queue with the current full
    /// snapshot so it observes state before any subsequent `edge_updated`
    /// events.
    pub fn subscribe(&self) -> Subscriber {
        let subscriber = self.event_bus.subscribe();
        subscriber.push(Event::Snapshot(Arc::new(self.snapshot(None))));
        subscriber
    }

    pub fn unsubscribe(&self, subscriber: &Subscriber) {
        self.event_bus.unsubscribe(subscriber);
    }
}

fn resolve_weight(
    edge: &EdgeRecord,
    weight: Option<f64>,
    speed_kmh: Option<f64>,
) -> GraphResult<f64> {
    let resolved = match (weight, speed_kmh) {
        (Some(w), None) => w,
        (None, Some(speed)) => {
            let distance_km = edge.distance_km.ok_or_else(|| {
                GraphError::InvalidWeight("speed_kmh requires an edge with distance_km".into())
            })?;
            distance_km / speed * 3600.0
        }
        (Some(_), Some(_)) => {
            return Err(GraphError::InvalidWeight(
                "exactly one of weight or speed_kmh must be given, not both".into(),
            ))
        }
        (None, None) => {
            return Err(GraphError::InvalidWeight(
                "one of weight or speed_kmh is required".into(),
            ))
        }
    };
    if resolved.is_nan() || resolved <= 0.0 {
        return Err(GraphError::InvalidWeight(format!(
            "weight must be strictly positive, got {resolved}"
        )));
    }
    Ok(resolved)
}

pub(crate) fn midpoint(a: GeoPoint, b: GeoPoint) -> GeoPoint {
    GeoPoint {
        lat: (a.lat + b.lat) / 2.0,
        lon: (a.lon + b.lon) / 2.0,
    }
}

pub(crate) fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    haversine_km(a.lat, a.lon, b.lat, b.lon)
}
