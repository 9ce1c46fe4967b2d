//! Great-circle distance between observations.

use crate::domain::Coordinates;

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Mean Earth radius in miles, for collaborators that display imperial units.
const EARTH_RADIUS_MILES: f64 = 3_958.8;

/// Haversine distance in meters.
pub fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    haversine(a, b, EARTH_RADIUS_METERS)
}

/// Haversine distance in miles.
pub fn haversine_miles(a: Coordinates, b: Coordinates) -> f64 {
    haversine(a, b, EARTH_RADIUS_MILES)
}

fn haversine(a: Coordinates, b: Coordinates, radius: f64) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let d_phi = (b.lat - a.lat).to_radians();
    let d_lambda = (b.lon - a.lon).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    radius * c
}
