//! The incident impact loop: periodically turns reported incidents into
//! edge weight multipliers and back, per edge's own `Clean -> Impacted(m)
//! -> Impacted(m') -> Clean` state machine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::warn;

use tg_core::Mode;
use tg_graph::config::{IncidentRule, EPSILON};
use tg_graph::GraphStore;

use crate::model::Incident;
use crate::source::IncidentSource;

/// Identifies one directed, keyed edge across any mode-graph.
type EdgeKey = (Mode, String, String, String);

/// An edge currently under an active incident's influence.
struct ImpactRecord {
    baseline: f64,
    multiplier: f64,
}

/// Polls an [`IncidentSource`] on an interval and drives [`GraphStore`]
/// edge mutations from the aggregated result.
pub struct IncidentImpactLoop<S: IncidentSource> {
    store: Arc<GraphStore>,
    source: S,
    poll_interval: Duration,
    rules: HashMap<String, IncidentRule>,
    impacts: HashMap<EdgeKey, ImpactRecord>,
}

impl<S: IncidentSource> IncidentImpactLoop<S> {
    pub fn new(store: Arc<GraphStore>, source: S) -> Self {
        let poll_interval = store.config().incident_poll_interval;
        let rules = store.config().incident_rules.clone();
        IncidentImpactLoop {
            store,
            source,
            poll_interval,
            rules,
            impacts: HashMap::new(),
        }
    }

    /// Run forever until `shutdown` resolves, ticking once per
    /// configured poll interval.
    pub async fn run(mut self, mut shutdown: tokio::sync::oneshot::Receiver<()>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => self.tick().await,
                _ = &mut shutdown => {
                    log::info!("incident impact loop shutting down");
                    break;
                }
            }
        }
    }

    /// Run exactly one cycle. Public so tests can drive the loop
    /// deterministically instead of waiting on a real timer.
    pub async fn tick(&mut self) {
        let incidents = match self.source.list_incidents().await {
            Ok(incidents) => incidents,
            Err(err) => {
                warn!("incident fetch failed, retaining previous target set: {err}");
                return;
            }
        };

        let target = self.target_multipliers(&incidents);
        self.apply_diff(target);
    }

    /// Resolve every fetched incident to its nearest transit edge, group
    /// by edge, and compute each edge's target multiplier per the
    /// category rules.
    fn target_multipliers(&self, incidents: &[Incident]) -> HashMap<EdgeKey, f64> {
        let mut by_edge: HashMap<EdgeKey, Vec<&Incident>> = HashMap::new();
        for incident in incidents {
            if !self.rules.contains_key(&incident.category) {
                continue;
            }
            let edge = match self.store.get_closest_transit_edge(incident.lat, incident.lon) {
                Ok(edge) => edge,
                Err(err) => {
                    warn!("could not resolve an edge for incident {}: {err}", incident.id);
                    continue;
                }
            };
            by_edge
                .entry((edge.mode, edge.source, edge.target, edge.key))
                .or_default()
                .push(incident);
        }

        by_edge
            .into_iter()
            .map(|(key, on_edge)| (key, self.edge_multiplier(&on_edge)))
            .filter(|&(_, multiplier)| multiplier - 1.0 > EPSILON)
            .collect()
    }

    /// The max of every qualifying category's multiplier among the
    /// incidents reported on one edge.
    fn edge_multiplier(&self, on_edge: &[&Incident]) -> f64 {
        let mut by_category: HashMap<&str, Vec<&Incident>> = HashMap::new();
        for incident in on_edge {
            by_category.entry(incident.category.as_str()).or_default().push(incident);
        }

        by_category
            .into_iter()
            .filter_map(|(category, incidents)| {
                let rule = self.rules.get(category)?;
                let qualifies = match rule.threshold {
                    None => true,
                    Some(threshold) => {
                        let approved = incidents.iter().any(|i| i.approved);
                        let score: f64 = incidents
                            .iter()
                            .filter(|i| !i.approved)
                            .map(|i| i.reporter_social_score)
                            .sum();
                        approved || score >= threshold
                    }
                };
                qualifies.then_some(rule.multiplier)
            })
            .fold(1.0, f64::max)
    }

    /// Update or revert each edge whose target multiplier differs from
    /// its currently applied one.
    fn apply_diff(&mut self, target: HashMap<EdgeKey, f64>) {
        let mut keys: Vec<EdgeKey> = self.impacts.keys().cloned().collect();
        for key in target.keys() {
            if !self.impacts.contains_key(key) {
                keys.push(key.clone());
            }
        }

        for key in keys {
            let new_multiplier = target.get(&key).copied().unwrap_or(1.0);
            let previous = self.impacts.get(&key).map(|r| r.multiplier);

            if previous == Some(new_multiplier) {
                continue;
            }

            if new_multiplier - 1.0 <= EPSILON {
                if let Some(record) = self.impacts.remove(&key) {
                    self.set_edge_weight(&key, record.baseline, 1.0);
                }
                continue;
            }

            let baseline = match self.impacts.get(&key) {
                Some(record) => record.baseline,
                None => match self.current_weight(&key) {
                    Some(weight) => weight,
                    None => continue,
                },
            };
            self.set_edge_weight(&key, baseline * new_multiplier, new_multiplier);
            self.impacts.insert(key, ImpactRecord { baseline, multiplier: new_multiplier });
        }
    }

    fn current_weight(&self, key: &EdgeKey) -> Option<f64> {
        let (mode, source, target, edge_key) = key;
        match self.store.get_edge(*mode, source, target, edge_key) {
            Ok(edge) => Some(edge.weight),
            Err(err) => {
                warn!("edge {source}->{target} ({edge_key}) vanished before it could be impacted: {err}");
                None
            }
        }
    }

    fn set_edge_weight(&self, key: &EdgeKey, weight: f64, multiplier: f64) {
        let (mode, source, target, edge_key) = key;
        let context = serde_json::json!({ "multiplier": multiplier });
        if let Err(err) = self.store.update_edge(*mode, source, target, Some(edge_key), Some(weight), None, Some(context)) {
            warn!("failed to apply incident multiplier to {source}->{target} ({edge_key}): {err}");
        }
    }
}
