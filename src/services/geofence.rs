use serde::Serialize;

use crate::config::OfficeGeofence;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// The result of testing a coordinate against the office perimeter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceReading {
    /// Great-circle distance to the office point in meters.
    pub distance_meters: f64,
    /// Whether the coordinate lies inside the perimeter (boundary included).
    pub within_perimeter: bool,
}

/// Computes the great-circle distance between two coordinates with the
/// haversine formula.
///
/// # Arguments
///
/// * `lat1`, `lng1` - The first coordinate in degrees.
/// * `lat2`, `lng2` - The second coordinate in degrees.
///
/// # Returns
///
/// The distance in meters.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let delta_phi = (lat2 - lat1).to_radians();
    let delta_lambda = (lng2 - lng1).to_radians();

    let a = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    EARTH_RADIUS_METERS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Evaluates a coordinate against the office perimeter.
pub fn evaluate(lat: f64, lng: f64, office: &OfficeGeofence) -> GeofenceReading {
    let distance_meters = haversine_distance(lat, lng, office.lat, office.lng);

    GeofenceReading {
        distance_meters,
        within_perimeter: distance_meters <= office.radius_meters,
    }
}
