//! The incident record consumed from the external incident store.

use chrono::{DateTime, Utc};

/// A single geolocated incident report, matching the external store's
/// `list_incidents` payload verbatim.
#[derive(Debug, Clone)]
pub struct Incident {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub category: String,
    pub username: String,
    pub approved: bool,
    pub reporter_social_score: f64,
    pub created_at: DateTime<Utc>,
}
