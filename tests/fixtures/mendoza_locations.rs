//! Gran Mendoza locations for realistic test fixtures.
//!
//! Coordinates are approximate street-level points taken from OpenStreetMap.

/// A named location with coordinates.
#[derive(Debug, Clone)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

/// Warehouse the default config starts and ends at.
pub const DEPOT: Location = Location::new("Galpon Godoy Cruz", -32.91973, -68.81829);

// ============================================================================
// Urban deliveries (well inside the 45 km radius)
// ============================================================================

pub const CITY: &[Location] = &[
    Location::new("Plaza Independencia", -32.8895, -68.8458),
    Location::new("Terminal del Sol", -32.8950, -68.8306),
    Location::new("Parque San Martin", -32.8850, -68.8620),
    Location::new("Plaza Godoy Cruz", -32.9253, -68.8446),
    Location::new("Palmares", -32.9570, -68.8540),
    Location::new("Plaza Maipu", -32.9833, -68.7897),
    Location::new("Las Heras Centro", -32.8497, -68.8288),
    Location::new("Guaymallen Centro", -32.8980, -68.7960),
];

// ============================================================================
// Outlying towns
// ============================================================================

pub const LUJAN: Location = Location::new("Lujan de Cuyo", -33.0363, -68.8776);
pub const AEROPUERTO: Location = Location::new("Aeropuerto El Plumerillo", -32.8317, -68.7929);
/// Roughly 75 km south of the depot.
pub const TUNUYAN: Location = Location::new("Tunuyan", -33.5760, -69.0150);
