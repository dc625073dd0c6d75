//! Acceptance scenarios exercising `GraphStore` end to end against small
//! in-memory GTFS fixtures, standing in for the original source's
//! `test_incident_impact_thresholds.py` / `test_nearest_edge_workflow.py`
//! scripts minus their process-spawning/HTTP harness.
//!
//! The threshold-gated Traffic and always-on Crush scenarios live in
//! `tg-incidents`' own test suite, since they exercise
//! `IncidentImpactLoop` rather than `GraphStore` alone.

use tg_core::Mode;
use tg_gtfs::{LoadedFeed, StopRecord, TripSegment};
use tg_graph::events::Event;
use tg_graph::{EngineConfig, GraphStore};

/// Three stops on one bus trip, already connected without any connector
/// edge, so path-planning scenarios exercise real transit hops only.
fn three_stop_feed() -> LoadedFeed {
    LoadedFeed {
        stops: vec![
            StopRecord { id: "A".to_string(), name: "Stop A".to_string(), lat: 50.060, lon: 19.930 },
            StopRecord { id: "B".to_string(), name: "Stop B".to_string(), lat: 50.062, lon: 19.938 },
            StopRecord { id: "C".to_string(), name: "Stop C".to_string(), lat: 50.065, lon: 19.945 },
        ],
        segments: vec![
            TripSegment {
                trip_id: "T1".to_string(),
                route_id: "R1".to_string(),
                route_name: "1".to_string(),
                mode: Mode::Bus,
                from_stop: "A".to_string(),
                to_stop: "B".to_string(),
                departure_time: 8 * 3600,
                arrival_time: 8 * 3600 + 120,
            },
            TripSegment {
                trip_id: "T1".to_string(),
                route_id: "R1".to_string(),
                route_name: "1".to_string(),
                mode: Mode::Bus,
                from_stop: "B".to_string(),
                to_stop: "C".to_string(),
                departure_time: 8 * 3600 + 120,
                arrival_time: 8 * 3600 + 300,
            },
        ],
    }
}

fn store() -> GraphStore {
    GraphStore::new(&three_stop_feed(), &[], EngineConfig::default())
}

// S1 — baseline path: no incident, no suggested alternative, totals equal.
#[test]
fn s1_baseline_path_has_no_suggested_alternative() {
    let store = store();
    let plan = store.plan_route(Mode::Bus, "A", "C").unwrap();

    assert!(!plan.incident_detected);
    assert!(plan.suggested_path.is_none());
    assert_eq!(plan.default_path.total_current_weight, plan.default_path.total_default_weight);
    assert_eq!(plan.default_path.nodes, vec!["A", "B", "C"]);
}

// S5 — nearest lookup excludes walking/bike even when those graphs exist
// alongside a transit mode.
#[test]
fn s5_nearest_lookup_never_returns_a_foot_mode() {
    let store = store();
    assert!(store.available_modes().contains(&Mode::Walking));
    assert!(store.available_modes().contains(&Mode::Bike));

    for (lat, lon) in [(50.060, 19.930), (50.0615, 19.934), (50.065, 19.945), (50.1, 20.0)] {
        let found = store.get_closest_transit_edge(lat, lon).unwrap();
        assert!(!matches!(found.mode, Mode::Walking | Mode::Bike));
    }
}

// S6 — three subscribers each see the initial snapshot then five
// edge_updated events in publish order, matching each post-image.
#[test]
fn s6_every_subscriber_observes_the_same_ordered_event_sequence() {
    let store = store();
    let subs = [store.subscribe(), store.subscribe(), store.subscribe()];

    let mut posted_weights = Vec::new();
    for i in 0..5u32 {
        let weight = 100.0 + i as f64;
        store.update_edge(Mode::Bus, "A", "B", Some("T1"), Some(weight), None, None).unwrap();
        posted_weights.push(weight);
    }

    for sub in &subs {
        assert!(matches!(sub.try_recv(), Some(Event::Snapshot(_))));
        for &expected in &posted_weights {
            match sub.try_recv() {
                Some(Event::EdgeUpdated(msg)) => assert_eq!(msg.edge.weight, expected),
                other => panic!("expected edge_updated with weight {expected}, got {other:?}"),
            }
        }
        assert!(sub.try_recv().is_none());
    }
}

// Invariant 1 & 2: default_weight stays positive and immutable; weight
// stays positive and never drops below default_weight - epsilon.
#[test]
fn invariant_default_weight_is_immutable_and_positive() {
    let store = store();
    let before = store.get_edge(Mode::Bus, "A", "B", "T1").unwrap();
    assert!(before.default_weight.unwrap() > 0.0);
    assert!(before.weight > 0.0);

    store.update_edge(Mode::Bus, "A", "B", Some("T1"), Some(500.0), None, None).unwrap();
    let after = store.get_edge(Mode::Bus, "A", "B", "T1").unwrap();
    assert_eq!(after.default_weight, before.default_weight);
    assert!(after.weight >= after.default_weight.unwrap() - 1e-6);
}

// Invariant 5: reverting an impact restores weight to exactly
// default_weight.
#[test]
fn invariant_reverting_an_impact_restores_the_default_weight_exactly() {
    let store = store();
    let baseline = store.get_edge(Mode::Bus, "A", "B", "T1").unwrap().default_weight.unwrap();

    store.update_edge(Mode::Bus, "A", "B", Some("T1"), Some(baseline * 1.5), None, None).unwrap();
    assert!(store.get_edge(Mode::Bus, "A", "B", "T1").unwrap().is_impacted(1e-6));

    store.update_edge(Mode::Bus, "A", "B", Some("T1"), Some(baseline), None, None).unwrap();
    let restored = store.get_edge(Mode::Bus, "A", "B", "T1").unwrap();
    assert_eq!(restored.weight, baseline);
    assert!(!restored.is_impacted(1e-6));
}

// Round-trip / idempotence: two successive update_edge calls with the
// same weight converge to one state but still emit two events.
#[test]
fn two_identical_updates_converge_to_one_state_but_emit_two_events() {
    let store = store();
    let sub = store.subscribe();
    assert!(matches!(sub.try_recv(), Some(Event::Snapshot(_))));

    store.update_edge(Mode::Bus, "A", "B", Some("T1"), Some(321.0), None, None).unwrap();
    store.update_edge(Mode::Bus, "A", "B", Some("T1"), Some(321.0), None, None).unwrap();

    assert_eq!(store.get_edge(Mode::Bus, "A", "B", "T1").unwrap().weight, 321.0);
    let mut seen = 0;
    while let Some(Event::EdgeUpdated(msg)) = sub.try_recv() {
        assert_eq!(msg.edge.weight, 321.0);
        seen += 1;
    }
    assert_eq!(seen, 2);
}

// Round-trip / idempotence: reloading the same bike parkings twice
// yields identical bike graphs.
#[test]
fn reloading_identical_bike_parkings_yields_identical_bike_graphs() {
    let store = store();
    let parkings = vec![tg_graph::BikeParking { lat: 50.061, lon: 19.934, name: None }];

    store.load_bike_parkings(&parkings, None);
    let first = store.snapshot(Some(Mode::Bike));
    store.load_bike_parkings(&parkings, None);
    let second = store.snapshot(Some(Mode::Bike));

    let first_json = serde_json::to_string(&first).unwrap();
    let second_json = serde_json::to_string(&second).unwrap();
    assert_eq!(first_json, second_json);
}
