//! Great-circle distance and unit conversion.

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Factor applied to a distance in meters by the miles conversion.
pub const METERS_TO_MILES: f64 = 0.621_371;

/// Haversine distance between two coordinates given in degrees, in meters.
#[must_use]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Applies the distance conversion used by [`crate::LocationManager`].
///
/// With `in_miles == false` the raw meters are scaled by [`METERS_TO_MILES`];
/// with `in_miles == true` they are returned unchanged.
#[must_use]
pub fn convert_distance(meters: f64, in_miles: bool) -> f64 {
    if in_miles {
        meters
    } else {
        meters * METERS_TO_MILES
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        assert!(haversine_distance(48.85, 2.35, 48.85, 2.35).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = haversine_distance(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111_195.0).abs() < 1.0, "{d}");
    }

    #[test]
    fn berlin_to_paris() {
        let d = haversine_distance(52.5200, 13.4050, 48.8566, 2.3522);
        assert!((d - 878_000.0).abs() < 10_000.0, "{d}");
    }

    #[test]
    fn symmetric() {
        let ab = haversine_distance(40.7128, -74.0060, 34.0522, -118.2437);
        let ba = haversine_distance(34.0522, -118.2437, 40.7128, -74.0060);
        assert!((ab - ba).abs() < 1e-6);
    }

    #[test]
    fn conversion_keeps_raw_meters_when_in_miles() {
        assert!((convert_distance(1000.0, true) - 1000.0).abs() < f64::EPSILON);
        assert!((convert_distance(1000.0, false) - 621.371).abs() < 1e-9);
    }
}
