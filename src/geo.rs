//! Geographic primitives: coordinates and great-circle distance.

use serde::{Deserialize, Serialize};

/// A point on the earth's surface, in degrees.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Haversine distance between two coordinates, in meters.
///
/// Unlike `blaise::shared::geo::Coordinate::network_distance`, this applies
/// no circuity factor: curvature is defined as road length over this value,
/// so it must be the unmodified great-circle distance.
pub fn great_circle_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_METERS * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_has_zero_distance() {
        let a = Coordinate::new(55.611_87, 37.208_32);
        assert_eq!(great_circle_distance(&a, &a), 0.0);
    }

    #[test]
    fn known_distance_is_roughly_correct() {
        let a = Coordinate::new(48.858_01, 2.351_435);
        let b = Coordinate::new(51.505_238, -0.124_954_075);
        let d = great_circle_distance(&a, &b);
        // Paris to London is roughly 343 km.
        assert!((d - 343_000.0).abs() < 5_000.0);
    }

    #[test]
    fn symmetric() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 1.0);
        assert_eq!(great_circle_distance(&a, &b), great_circle_distance(&b, &a));
    }
}
