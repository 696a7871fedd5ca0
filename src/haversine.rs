//! Haversine distance provider (offline estimate, no external service).
//!
//! Uses great-circle distance and an assumed urban speed.
//! Ignores roads, so only suitable for dry runs and eligibility distances.

use crate::error::ProviderError;
use crate::matrix::{Leg, validate_all};
use crate::model::Coordinate;
use crate::traits::DistanceMatrixProvider;

/// Average urban driving speed assumption.
pub const URBAN_SPEED_KMH: f64 = 40.0;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: Coordinate, to: Coordinate) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Haversine-based distance provider.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            speed_kmh: URBAN_SPEED_KMH,
        }
    }
}

impl HaversineMatrix {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }

    /// Convert distance in km to travel time in minutes.
    fn km_to_minutes(&self, km: f64) -> f64 {
        km / self.speed_kmh * 60.0
    }

    fn leg(&self, from: Coordinate, to: Coordinate) -> Leg {
        let km = haversine_km(from, to);
        Leg::new(self.km_to_minutes(km), km)
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn name(&self) -> &str {
        "haversine"
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        validate_all(origin, destinations)?;
        Ok(destinations
            .iter()
            .map(|to| Some(self.leg(origin, *to)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let p = Coordinate::new(-32.9, -68.8);
        assert!(haversine_km(p, p) < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Mendoza (-32.89, -68.83) to San Juan (-31.54, -68.54), ~150 km
        let dist = haversine_km(Coordinate::new(-32.89, -68.83), Coordinate::new(-31.54, -68.54));
        assert!(dist > 140.0 && dist < 160.0, "Mendoza to San Juan should be ~150km, got {}", dist);
    }

    #[test]
    fn test_matrix_diagonal_is_zero() {
        let provider = HaversineMatrix::default();
        let locations = vec![
            Coordinate::new(-32.9, -68.8),
            Coordinate::new(-32.95, -68.85),
            Coordinate::new(-33.0, -68.9),
        ];
        let matrix = provider.matrix_for(&locations).unwrap();

        for i in 0..locations.len() {
            assert_eq!(matrix.get(i, i).unwrap().duration_min, 0.0, "Diagonal should be zero");
        }
    }

    #[test]
    fn test_matrix_symmetric() {
        let provider = HaversineMatrix::default();
        let locations = vec![Coordinate::new(-32.9, -68.8), Coordinate::new(-32.95, -68.85)];
        let matrix = provider.matrix_for(&locations).unwrap();
        assert_eq!(matrix.get(0, 1), matrix.get(1, 0), "Matrix should be symmetric");
    }

    #[test]
    fn test_reasonable_travel_time() {
        let provider = HaversineMatrix::new(40.0);
        // 10 km at 40 km/h = 15 minutes
        assert_eq!(provider.km_to_minutes(10.0), 15.0);
    }

    #[test]
    fn test_invalid_coordinate_rejected() {
        let provider = HaversineMatrix::default();
        let err = provider
            .legs_from(Coordinate::new(0.0, 0.0), &[Coordinate::new(95.0, 0.0)])
            .unwrap_err();
        assert_eq!(err, ProviderError::InvalidCoordinate { lat: 95.0, lng: 0.0 });
    }
}
