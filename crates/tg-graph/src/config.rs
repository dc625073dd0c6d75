//! `EngineConfig` — environment-driven configuration, layered with the
//! `config` crate the way `bambam` layers its own environment sources.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::GraphResult;

/// Default epsilon below which a `weight` is considered equal to its
/// `default_weight` (see `tg-graph`'s edge "impacted" definition).
pub const EPSILON: f64 = 1e-6;

/// A category → multiplier rule for the incident impact loop.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentRule {
    pub multiplier: f64,
    /// `None` means always-on (applies regardless of aggregate trust).
    pub threshold: Option<f64>,
}

/// Engine-wide configuration, populated from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub gtfs_feed_path: String,
    pub walking_speed_kmh: f64,
    pub bike_speed_kmh: f64,
    pub bike_access_radius_m: f64,
    pub bike_parkings_path: Option<String>,
    pub incident_poll_interval: Duration,
    pub incident_rules: HashMap<String, IncidentRule>,
}

impl EngineConfig {
    /// Load configuration from the process environment, falling back to
    /// the defaults named in the engine's external-interfaces contract.
    pub fn from_env() -> GraphResult<Self> {
        let source = config::Config::builder()
            .set_default("walking_speed_kmh", 5.0)?
            .set_default("bike_speed_kmh", 20.0)?
            .set_default("bike_access_radius_m", 150.0)?
            .set_default("incident_poll_interval_seconds", 60u64)?
            .add_source(config::Environment::default())
            .build()?;

        let gtfs_feed_path = source.get_string("gtfs_feed_path").unwrap_or_default();
        let walking_speed_kmh = source.get_float("walking_speed_kmh")?;
        let bike_speed_kmh = source.get_float("bike_speed_kmh")?;
        let bike_access_radius_m = source.get_float("bike_access_radius_m")?;
        let bike_parkings_path = source.get_string("bike_parkings_path").ok();
        let poll_secs = source.get_int("incident_poll_interval_seconds")? as u64;

        Ok(EngineConfig {
            gtfs_feed_path,
            walking_speed_kmh,
            bike_speed_kmh,
            bike_access_radius_m,
            bike_parkings_path,
            incident_poll_interval: Duration::from_secs(poll_secs),
            incident_rules: default_incident_rules(),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            gtfs_feed_path: String::new(),
            walking_speed_kmh: 5.0,
            bike_speed_kmh: 20.0,
            bike_access_radius_m: 150.0,
            bike_parkings_path: None,
            incident_poll_interval: Duration::from_secs(60),
            incident_rules: default_incident_rules(),
        }
    }
}

/// Default category→multiplier map: `Traffic` is threshold-gated,
/// `Crush` is always-on and effectively blocking.
fn default_incident_rules() -> HashMap<String, IncidentRule> {
    let mut rules = HashMap::new();
    rules.insert(
        "Traffic".to_string(),
        IncidentRule {
            multiplier: 1.5,
            threshold: Some(50.0),
        },
    );
    rules.insert(
        "Crush".to_string(),
        IncidentRule {
            multiplier: 1e13,
            threshold: None,
        },
    );
    rules
}
