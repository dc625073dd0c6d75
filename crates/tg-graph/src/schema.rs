//! Wire message and request shapes. These are exactly the payloads an
//! out-of-scope HTTP/WebSocket layer would serialize; no server lives here.

use serde::{Deserialize, Serialize};

use tg_core::Mode;

/// A node as seen by a client: a stop plus the derived bike-accessibility
/// flag, omitting fields the client didn't ask about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bike_accessible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_name: Option<String>,
}

/// A directed edge as seen by a client, including the optional event
/// `context` tag carried on `edge_updated` events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeView {
    pub mode: Mode,
    pub source: String,
    pub target: String,
    pub key: String,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connector: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trip_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_long_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl EdgeView {
    /// `true` iff `weight` exceeds `default_weight` by more than epsilon.
    pub fn is_impacted(&self, epsilon: f64) -> bool {
        match self.default_weight {
            Some(default_weight) => self.weight - default_weight > epsilon,
            None => false,
        }
    }
}

/// One hop of a [`RoutePlan`], carrying both the default and live cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSegment {
    pub source: String,
    pub target: String,
    pub key: String,
    pub default_weight: f64,
    pub current_weight: f64,
    pub impacted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_short_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_long_name: Option<String>,
}

/// A materialized path: the visited node ids plus per-segment detail and
/// aggregate totals for both weight fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathPlan {
    pub nodes: Vec<String>,
    pub segments: Vec<RouteSegment>,
    pub total_default_weight: f64,
    pub total_current_weight: f64,
}

/// The result of [`crate::store::GraphStore::plan_route`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub incident_detected: bool,
    pub default_path: PathPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_path: Option<PathPlan>,
    pub message: String,
}

/// One mode's worth of nodes and edges, as returned by `snapshot`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphView {
    pub mode: Mode,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

/// Full (or single-mode) graph snapshot, the first frame sent to a new
/// subscriber and the payload of a bulk-refresh broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMessage {
    pub graphs: Vec<GraphView>,
}

/// A single-edge mutation, broadcast to subscribers after every
/// `update_edge` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeUpdatedMessage {
    pub edge: EdgeView,
}

/// Request body for nearest-edge lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestEdgeRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// Request body for an edge weight/speed mutation.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateEdgeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}
