//! Geographic calculations
//!
//! Great-circle distance and a flat-earth offset helper. Both are used over
//! short ranges (tens of meters) where the spherical model is more than
//! accurate enough.

use libm::{atan2, cos, sin, sqrt};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude (flat-earth approximation).
const METERS_PER_DEG_LAT: f64 = 111_320.0;

/// A captured latitude/longitude/altitude triple.
///
/// Taken from a telemetry position at a specific instant and later used as a
/// navigation target or as the reference for a convergence check.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct GeoFix {
    /// Latitude in degrees
    pub lat_deg: f64,
    /// Longitude in degrees
    pub lon_deg: f64,
    /// Altitude above mean sea level in meters
    pub abs_alt_m: f64,
}

impl GeoFix {
    pub fn new(lat_deg: f64, lon_deg: f64, abs_alt_m: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            abs_alt_m,
        }
    }

    /// Horizontal great-circle distance to another fix, in meters.
    pub fn distance_to(&self, other: &GeoFix) -> f64 {
        haversine_distance(self.lat_deg, self.lon_deg, other.lat_deg, other.lon_deg)
    }
}

/// Great-circle distance in meters between two positions given in degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let sin_dlat = sin(delta_lat / 2.0);
    let sin_dlon = sin(delta_lon / 2.0);
    let a = sin_dlat * sin_dlat + cos(lat1_rad) * cos(lat2_rad) * sin_dlon * sin_dlon;
    let c = 2.0 * atan2(sqrt(a), sqrt(1.0 - a));
    EARTH_RADIUS_M * c
}

/// Offset a position by local north/east displacements in meters.
///
/// Returns `(lat_deg, lon_deg)`.
pub fn offset_position(lat_deg: f64, lon_deg: f64, north_m: f64, east_m: f64) -> (f64, f64) {
    let meters_per_deg_lon = METERS_PER_DEG_LAT * cos(lat_deg.to_radians());
    (
        lat_deg + north_m / METERS_PER_DEG_LAT,
        lon_deg + east_m / meters_per_deg_lon,
    )
}
