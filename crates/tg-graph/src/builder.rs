//! Graph construction: per-mode transit graphs from a loaded GTFS feed,
//! a synthesized walking graph over every stop pair directly linked by a
//! trip segment, a bike graph sharing that topology, and a weakly-
//! connected-components repair pass. Grounded on `dt_spatial`'s
//! `RoadNetworkBuilder` CSR build step, generalized from a single fixed
//! road topology to several mode-keyed graphs built from schedule data,
//! with a live component search replacing a one-shot pre-connected OSM
//! import.

use std::collections::{HashMap, HashSet};

use tg_core::{GeoPoint, Mode, NodeId};
use tg_gtfs::{LoadedFeed, TripSegment};

use crate::config::EngineConfig;
use crate::model::BikeParking;
use crate::store::{distance_km, EdgeRecord, ModeGraph};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// An edge before it has been sorted into a `ModeGraph`'s CSR layout.
struct EdgeDraft {
    source: NodeId,
    target: NodeId,
    key: String,
    weight: f64,
    default_weight: f64,
    distance_km: Option<f64>,
    speed_kmh: Option<f64>,
    trip_id: Option<String>,
    route_id: Option<String>,
    route_short_name: Option<String>,
    route_long_name: Option<String>,
    connector: bool,
}

/// Every stop, and every unordered pair of stops directly linked by some
/// trip segment (regardless of mode). Kept around so a later
/// [`build_bike_graph`] call can recompute bike speeds without re-reading
/// the GTFS feed.
pub struct WalkTopology {
    pub(crate) stop_ids: Vec<String>,
    pub(crate) positions: Vec<GeoPoint>,
    pub(crate) pairs: Vec<(usize, usize)>,
}

pub struct BuiltGraphs {
    pub graphs: HashMap<Mode, ModeGraph>,
    pub walk_topology: WalkTopology,
    pub bike_accessible: HashSet<String>,
}

/// Build every mode's graph from a loaded feed: one transit graph per
/// mode present in the feed, plus the synthesized walking and bike
/// graphs.
pub fn build_graphs(
    feed: &LoadedFeed,
    bike_parkings: &[BikeParking],
    config: &EngineConfig,
) -> BuiltGraphs {
    let stop_index: HashMap<&str, usize> = feed
        .stops
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();
    let positions: Vec<GeoPoint> = feed.stops.iter().map(|s| GeoPoint { lat: s.lat, lon: s.lon }).collect();
    let stop_ids: Vec<String> = feed.stops.iter().map(|s| s.id.clone()).collect();

    let mut by_mode: HashMap<Mode, Vec<&TripSegment>> = HashMap::new();
    for seg in &feed.segments {
        by_mode.entry(seg.mode).or_default().push(seg);
    }

    let mut graphs: HashMap<Mode, ModeGraph> = by_mode
        .into_iter()
        .map(|(mode, segs)| (mode, build_transit_mode_graph(mode, &segs, &stop_index, &positions, config)))
        .collect();

    let pairs = connected_pairs(feed, &stop_index);
    let walk_topology = WalkTopology {
        stop_ids,
        positions,
        pairs,
    };

    let walking_drafts = walking_edge_drafts(&walk_topology, config.walking_speed_kmh);
    graphs.insert(Mode::Walking, build_geometric_graph(Mode::Walking, &walk_topology, walking_drafts, config.walking_speed_kmh));

    let (bike_graph, bike_accessible) = build_bike_graph(&walk_topology, bike_parkings, config.bike_access_radius_m, config);
    graphs.insert(Mode::Bike, bike_graph);

    BuiltGraphs {
        graphs,
        walk_topology,
        bike_accessible,
    }
}

/// Rebuild only the bike graph and its accessibility set, reusing the
/// walking topology captured at initial build time.
pub fn build_bike_graph(
    topology: &WalkTopology,
    locations: &[BikeParking],
    radius_m: f64,
    config: &EngineConfig,
) -> (ModeGraph, HashSet<String>) {
    let accessible = bike_accessible_stops(topology, locations, radius_m);
    let drafts: Vec<EdgeDraft> = topology
        .pairs
        .iter()
        .flat_map(|&(a, b)| {
            let both_accessible =
                accessible.contains(&topology.stop_ids[a]) && accessible.contains(&topology.stop_ids[b]);
            let speed_kmh = if both_accessible { config.bike_speed_kmh } else { config.walking_speed_kmh };
            geometric_edge_pair(topology, a, b, speed_kmh, "bike")
        })
        .collect();
    let graph = build_geometric_graph(Mode::Bike, topology, drafts, config.bike_speed_kmh);
    (graph, accessible)
}

fn bike_accessible_stops(
    topology: &WalkTopology,
    locations: &[BikeParking],
    radius_m: f64,
) -> HashSet<String> {
    topology
        .stop_ids
        .iter()
        .enumerate()
        .filter(|&(i, _)| {
            locations.iter().any(|parking| {
                distance_km(topology.positions[i], GeoPoint { lat: parking.lat, lon: parking.lon }) * 1000.0
                    <= radius_m
            })
        })
        .map(|(_, id)| id.clone())
        .collect()
}

/// Every unordered stop pair directly linked by a trip segment in either
/// direction, deduplicated.
fn connected_pairs(feed: &LoadedFeed, stop_index: &HashMap<&str, usize>) -> Vec<(usize, usize)> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    for seg in &feed.segments {
        let (Some(&a), Some(&b)) = (stop_index.get(seg.from_stop.as_str()), stop_index.get(seg.to_stop.as_str()))
        else {
            continue;
        };
        if a == b {
            continue;
        }
        seen.insert(if a < b { (a, b) } else { (b, a) });
    }
    seen.into_iter().collect()
}

fn walking_edge_drafts(topology: &WalkTopology, speed_kmh: f64) -> Vec<EdgeDraft> {
    topology
        .pairs
        .iter()
        .flat_map(|&(a, b)| geometric_edge_pair(topology, a, b, speed_kmh, "walk"))
        .collect()
}

/// The two directed edges (`a -> b`, `b -> a`) for an undirected
/// geometric link at the given speed.
fn geometric_edge_pair(
    topology: &WalkTopology,
    a: usize,
    b: usize,
    speed_kmh: f64,
    label: &str,
) -> [EdgeDraft; 2] {
    let distance_km = distance_km(topology.positions[a], topology.positions[b]);
    let weight = distance_km / speed_kmh * 3600.0;
    let make = |source: usize, target: usize| EdgeDraft {
        source: NodeId(source as u32),
        target: NodeId(target as u32),
        key: format!("{label}:{}-{}", topology.stop_ids[source], topology.stop_ids[target]),
        weight,
        default_weight: weight,
        distance_km: Some(distance_km),
        speed_kmh: Some(speed_kmh),
        trip_id: None,
        route_id: None,
        route_short_name: None,
        route_long_name: None,
        connector: false,
    };
    [make(a, b), make(b, a)]
}

fn build_transit_mode_graph(
    mode: Mode,
    segments: &[&TripSegment],
    global_stop_index: &HashMap<&str, usize>,
    global_positions: &[GeoPoint],
    config: &EngineConfig,
) -> ModeGraph {
    let mut local_index: HashMap<String, u32> = HashMap::new();
    let mut local_ids: Vec<String> = Vec::new();
    let mut local_positions: Vec<GeoPoint> = Vec::new();

    let node_of = |stop_id: &str,
                        local_index: &mut HashMap<String, u32>,
                        local_ids: &mut Vec<String>,
                        local_positions: &mut Vec<GeoPoint>|
     -> NodeId {
        if let Some(&n) = local_index.get(stop_id) {
            return NodeId(n);
        }
        let global = global_stop_index[stop_id];
        let n = local_ids.len() as u32;
        local_index.insert(stop_id.to_string(), n);
        local_ids.push(stop_id.to_string());
        local_positions.push(global_positions[global]);
        NodeId(n)
    };

    let mut drafts = Vec::new();
    for seg in segments {
        let duration = seg.arrival_time as f64 - seg.departure_time as f64;
        if duration <= 0.0 {
            continue;
        }
        let source = node_of(&seg.from_stop, &mut local_index, &mut local_ids, &mut local_positions);
        let target = node_of(&seg.to_stop, &mut local_index, &mut local_ids, &mut local_positions);
        drafts.push(EdgeDraft {
            source,
            target,
            key: seg.trip_id.clone(),
            weight: duration,
            default_weight: duration,
            distance_km: None,
            speed_kmh: None,
            trip_id: Some(seg.trip_id.clone()),
            route_id: Some(seg.route_id.clone()),
            route_short_name: Some(seg.route_name.clone()),
            route_long_name: None,
            connector: false,
        });
    }

    repair_connectivity(&local_positions, &mut drafts, default_connector_speed_kmh(mode, config));
    finalize(mode, local_ids, local_positions, drafts)
}

fn build_geometric_graph(
    mode: Mode,
    topology: &WalkTopology,
    mut drafts: Vec<EdgeDraft>,
    connector_speed_kmh: f64,
) -> ModeGraph {
    repair_connectivity(&topology.positions, &mut drafts, connector_speed_kmh);
    finalize(mode, topology.stop_ids.clone(), topology.positions.clone(), drafts)
}

/// Average scheduled speed assumed only for a synthetic connector edge
/// joining otherwise-unreachable transit components; never a real
/// service speed.
fn default_connector_speed_kmh(mode: Mode, config: &EngineConfig) -> f64 {
    match mode {
        Mode::Walking => config.walking_speed_kmh,
        Mode::Bike => config.bike_speed_kmh,
        _ => 30.0,
    }
}

fn finalize(mode: Mode, stop_ids: Vec<String>, positions: Vec<GeoPoint>, mut drafts: Vec<EdgeDraft>) -> ModeGraph {
    let n = stop_ids.len();
    drafts.sort_by_key(|d| d.source.index());

    let mut node_out_start = vec![0u32; n + 1];
    for d in &drafts {
        node_out_start[d.source.index() + 1] += 1;
    }
    for i in 0..n {
        node_out_start[i + 1] += node_out_start[i];
    }

    let edges = drafts
        .into_iter()
        .map(|d| EdgeRecord {
            key: d.key,
            source: d.source,
            target: d.target,
            default_weight: d.default_weight,
            weight: d.weight,
            distance_km: d.distance_km,
            speed_kmh: d.speed_kmh,
            trip_id: d.trip_id,
            route_id: d.route_id,
            route_short_name: d.route_short_name,
            route_long_name: d.route_long_name,
            connector: d.connector,
        })
        .collect();

    let stop_index = stop_ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.clone(), NodeId(i as u32)))
        .collect();

    ModeGraph {
        mode,
        stop_ids,
        stop_index,
        positions,
        node_out_start,
        edges,
    }
}

// ── Connectivity repair ──────────────────────────────────────────────────

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        UnionFind {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Label every node 0..n with its weakly-connected-component index.
/// Labels are assigned in node order, so label `0` always names the
/// component containing node `0` (the "first component" connectivity
/// repair targets).
fn weak_components(n: usize, drafts: &[EdgeDraft]) -> Vec<usize> {
    let mut uf = UnionFind::new(n);
    for d in drafts {
        uf.union(d.source.index(), d.target.index());
    }
    let mut next_label = 0usize;
    let mut assigned: HashMap<usize, usize> = HashMap::new();
    (0..n)
        .map(|i| {
            let root = uf.find(i);
            *assigned.entry(root).or_insert_with(|| {
                let l = next_label;
                next_label += 1;
                l
            })
        })
        .collect()
}

/// The geographically nearest pair `(a, b)` with `a` in component 0 and
/// `b` outside it, by haversine distance.
fn nearest_cross_component_pair(positions: &[GeoPoint], labels: &[usize]) -> Option<(usize, usize, f64)> {
    let in_first: Vec<usize> = (0..positions.len()).filter(|&i| labels[i] == 0).collect();
    let outside: Vec<usize> = (0..positions.len()).filter(|&i| labels[i] != 0).collect();
    if in_first.is_empty() || outside.is_empty() {
        return None;
    }

    let best_for = |a: usize| {
        outside
            .iter()
            .map(|&b| (a, b, distance_km(positions[a], positions[b])))
            .min_by(|x, y| x.2.total_cmp(&y.2))
    };

    #[cfg(feature = "parallel")]
    let best = in_first.par_iter().filter_map(|&a| best_for(a)).min_by(|x, y| x.2.total_cmp(&y.2));
    #[cfg(not(feature = "parallel"))]
    let best = in_first.iter().filter_map(|&a| best_for(a)).min_by(|x, y| x.2.total_cmp(&y.2));

    best
}

/// While more than one weakly-connected component remains, join the
/// first component to the nearest node of any other component with a
/// symmetric pair of connector edges.
fn repair_connectivity(positions: &[GeoPoint], drafts: &mut Vec<EdgeDraft>, speed_kmh: f64) {
    let n = positions.len();
    if n <= 1 {
        return;
    }
    loop {
        let labels = weak_components(n, drafts);
        if labels.iter().all(|&l| l == 0) {
            break;
        }
        let Some((a, b, distance_km)) = nearest_cross_component_pair(positions, &labels) else {
            break;
        };
        log::debug!(
            "connectivity repair: joining node {a} to node {b} ({distance_km:.3} km) across {} components",
            labels.iter().copied().collect::<HashSet<_>>().len()
        );
        let weight = distance_km / speed_kmh * 3600.0;
        let make = |source: usize, target: usize| EdgeDraft {
            source: NodeId(source as u32),
            target: NodeId(target as u32),
            key: format!("connector:{source}-{target}"),
            weight,
            default_weight: weight,
            distance_km: Some(distance_km),
            speed_kmh: Some(speed_kmh),
            trip_id: None,
            route_id: None,
            route_short_name: None,
            route_long_name: None,
            connector: true,
        };
        drafts.push(make(a, b));
        drafts.push(make(b, a));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tg_gtfs::StopRecord;

    fn segment(mode: Mode, trip: &str, route: &str, from: &str, to: &str, dep: u32, arr: u32) -> TripSegment {
        TripSegment {
            trip_id: trip.to_string(),
            route_id: route.to_string(),
            route_name: route.to_string(),
            mode,
            from_stop: from.to_string(),
            to_stop: to.to_string(),
            departure_time: dep,
            arrival_time: arr,
        }
    }

    fn stop(id: &str, lat: f64, lon: f64) -> StopRecord {
        StopRecord { id: id.to_string(), name: id.to_string(), lat, lon }
    }

    #[test]
    fn builds_a_transit_graph_with_one_edge_per_trip_hop() {
        let feed = LoadedFeed {
            stops: vec![stop("A", 50.0, 19.0), stop("B", 50.01, 19.01), stop("C", 50.02, 19.02)],
            segments: vec![
                segment(Mode::Bus, "T1", "R1", "A", "B", 0, 300),
                segment(Mode::Bus, "T1", "R1", "B", "C", 300, 600),
            ],
        };
        let config = EngineConfig::default();
        let built = build_graphs(&feed, &[], &config);
        let bus = built.graphs.get(&Mode::Bus).unwrap();
        assert_eq!(bus.node_count(), 3);
        assert_eq!(bus.edges.len(), 2);
    }

    #[test]
    fn skips_trip_hops_with_non_positive_duration() {
        let feed = LoadedFeed {
            stops: vec![stop("A", 50.0, 19.0), stop("B", 50.01, 19.01)],
            segments: vec![segment(Mode::Bus, "T1", "R1", "A", "B", 300, 300)],
        };
        let built = build_graphs(&feed, &[], &EngineConfig::default());
        let bus = built.graphs.get(&Mode::Bus).unwrap();
        assert!(bus.edges.is_empty());
    }

    #[test]
    fn walking_graph_links_every_stop_pair_seen_in_a_trip() {
        let feed = LoadedFeed {
            stops: vec![stop("A", 50.0, 19.0), stop("B", 50.001, 19.001)],
            segments: vec![segment(Mode::Bus, "T1", "R1", "A", "B", 0, 300)],
        };
        let built = build_graphs(&feed, &[], &EngineConfig::default());
        let walking = built.graphs.get(&Mode::Walking).unwrap();
        assert_eq!(walking.edges.len(), 2);
        assert!(walking.edges.iter().all(|e| e.weight > 0.0));
    }

    #[test]
    fn bike_graph_uses_bike_speed_only_near_parking() {
        let feed = LoadedFeed {
            stops: vec![stop("A", 50.0, 19.0), stop("B", 50.01, 19.01)],
            segments: vec![segment(Mode::Bus, "T1", "R1", "A", "B", 0, 300)],
        };
        let config = EngineConfig::default();
        let built = build_graphs(&feed, &[], &config);
        let bike = built.graphs.get(&Mode::Bike).unwrap();
        let walk_edge_weight = built.graphs[&Mode::Walking].edges[0].weight;
        assert_eq!(bike.edges[0].weight, walk_edge_weight);

        let parkings = vec![
            BikeParking { lat: 50.0, lon: 19.0, name: None },
            BikeParking { lat: 50.01, lon: 19.01, name: None },
        ];
        let (bike_near_parking, accessible) =
            build_bike_graph(&built.walk_topology, &parkings, 200.0, &config);
        assert_eq!(accessible.len(), 2);
        assert!(bike_near_parking.edges[0].weight < walk_edge_weight);
    }

    #[test]
    fn repairs_connectivity_with_a_connector_edge() {
        let feed = LoadedFeed {
            stops: vec![
                stop("A", 50.0, 19.0),
                stop("B", 50.01, 19.01),
                stop("C", 51.0, 20.0),
                stop("D", 51.01, 20.01),
            ],
            segments: vec![
                segment(Mode::Bus, "T1", "R1", "A", "B", 0, 300),
                segment(Mode::Bus, "T2", "R1", "C", "D", 0, 300),
            ],
        };
        let built = build_graphs(&feed, &[], &EngineConfig::default());
        let bus = built.graphs.get(&Mode::Bus).unwrap();
        assert_eq!(bus.node_count(), 4);
        assert!(bus.edges.iter().any(|e| e.connector));
    }
}
