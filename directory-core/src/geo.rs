//! Great-circle distance between two points, in miles.

use crate::Coordinates;

/// Mean Earth radius used by the radius filter.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Haversine distance in miles.
///
/// Returns `f64::INFINITY` when any input is not finite or lies outside the
/// valid latitude/longitude range, so a `distance <= radius` check fails
/// closed for unusable coordinates.
pub fn calculate_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    if !is_valid_point(lat1, lng1) || !is_valid_point(lat2, lng2) {
        return f64::INFINITY;
    }

    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_MILES * c
}

fn is_valid_point(lat: f64, lng: f64) -> bool {
    lat.is_finite() && lng.is_finite() && lat.abs() <= 90.0 && lng.abs() <= 180.0
}

impl Coordinates {
    /// Distance in miles to another point.
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        calculate_distance(self.lat, self.lng, other.lat, other.lng)
    }

    /// Whether both components are finite and inside the valid ranges.
    pub fn is_valid(&self) -> bool {
        is_valid_point(self.lat, self.lng)
    }

    /// Clamp into lat ∈ [-90, 90], lng ∈ [-180, 180]. Non-finite components
    /// cannot be clamped and yield `None`.
    pub fn clamped(&self) -> Option<Coordinates> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return None;
        }
        Some(Coordinates {
            lat: self.lat.clamp(-90.0, 90.0),
            lng: self.lng.clamp(-180.0, 180.0),
        })
    }
}
