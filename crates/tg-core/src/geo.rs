//! Geographic coordinate type and spatial utilities.
//!
//! `GeoPoint` uses `f64` latitude/longitude. Transit networks span whole
//! metro areas with coordinates straight from GTFS `stops.txt`, so we keep
//! double precision rather than the single-precision shortcut a city-block
//! agent simulation can get away with.

/// A WGS-84 geographic coordinate.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[inline]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Haversine great-circle distance in kilometres.
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        haversine_km(self.lat, self.lon, other.lat, other.lon)
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Great-circle distance between two lat/lon pairs, in kilometres.
///
/// Pure and total on finite floats: symmetric, and zero on equal inputs.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_on_equal_inputs() {
        assert_eq!(haversine_km(50.06, 19.94, 50.06, 19.94), 0.0);
    }

    #[test]
    fn symmetric() {
        let a = haversine_km(50.06, 19.94, 50.08, 19.91);
        let b = haversine_km(50.08, 19.91, 50.06, 19.94);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn known_distance_krakow_warsaw() {
        // Kraków main square to Warsaw's Palace of Culture, ~250 km apart.
        let d = haversine_km(50.0617, 19.9373, 52.2319, 21.0067);
        assert!((200.0..300.0).contains(&d), "got {d}");
    }

    #[test]
    fn finite_on_antipodal_points() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * 6371.0).abs() < 1.0);
    }
}
