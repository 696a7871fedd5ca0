//! Route geometry.
//!
//! Points are kept decoded as `(lat, lng)` pairs; GeoJSON output (which is
//! `[lng, lat]`) happens at the boundary.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::model::{Coordinate, Stop};

/// Route geometry as decoded coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    /// Straight-line geometry of a run: depot, every stop in order, depot.
    ///
    /// A run without stops has an empty geometry.
    pub fn for_route(depot: Coordinate, stops: &[Stop]) -> Self {
        if stops.is_empty() {
            return Self::default();
        }
        let points = std::iter::once(depot)
            .chain(stops.iter().map(Stop::coordinate))
            .chain(std::iter::once(depot))
            .map(|c| c.as_tuple())
            .collect();
        Self { points }
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// GeoJSON `LineString` geometry with `[lng, lat]` positions.
    pub fn to_geojson(&self) -> Value {
        let coordinates: Vec<[f64; 2]> = self.points.iter().map(|&(lat, lng)| [lng, lat]).collect();
        json!({
            "type": "LineString",
            "coordinates": coordinates,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StopStatus;
    use crate::window::Franja;

    fn stop_at(orden: usize, lat: f64, lng: f64) -> Stop {
        Stop {
            orden,
            remito_id: orden as u64,
            remito_numero: format!("R-{orden}"),
            cliente: String::new(),
            direccion: String::new(),
            lat,
            lng,
            minutos_desde_anterior: 0.0,
            distancia_desde_anterior_km: 0.0,
            tiempo_espera_min: 10.0,
            minutos_acumulados: 0.0,
            es_urgente: false,
            es_prioridad: false,
            ventana_tipo: Franja::SinHorario,
            estado: StopStatus::Pendiente,
        }
    }

    #[test]
    fn test_for_route_closes_loop() {
        let depot = Coordinate::new(-32.91973, -68.81829);
        let stops = vec![stop_at(1, -32.90, -68.80), stop_at(2, -32.88, -68.84)];
        let polyline = Polyline::for_route(depot, &stops);

        assert_eq!(polyline.points().len(), 4);
        assert_eq!(polyline.points()[0], depot.as_tuple());
        assert_eq!(polyline.points()[3], depot.as_tuple());
        assert_eq!(polyline.points()[1], (-32.90, -68.80));
    }

    #[test]
    fn test_for_route_empty_without_stops() {
        let polyline = Polyline::for_route(Coordinate::new(-32.9, -68.8), &[]);
        assert!(polyline.is_empty());
    }

    #[test]
    fn test_geojson_swaps_axes() {
        let depot = Coordinate::new(-32.9, -68.8);
        let polyline = Polyline::for_route(depot, &[stop_at(1, -32.85, -68.79)]);
        let geojson = polyline.to_geojson();
        assert_eq!(geojson["type"], "LineString");
        assert_eq!(geojson["coordinates"][0][0], -68.8);
        assert_eq!(geojson["coordinates"][0][1], -32.9);
        assert_eq!(geojson["coordinates"][1][0], -68.79);
        assert_eq!(geojson["coordinates"].as_array().unwrap().len(), 3);
    }
}
