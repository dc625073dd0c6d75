//! Plain data carried between the loader, builder, and graph store.

/// A geolocated bike-parking point. Stops within
/// [`EngineConfig::bike_access_radius_m`](crate::config::EngineConfig) of
/// any parking become bike-accessible.
#[derive(Debug, Clone)]
pub struct BikeParking {
    pub lat: f64,
    pub lon: f64,
    pub name: Option<String>,
}
