//! Route generation and provider configuration.

use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::matrix::ProviderKind;
use crate::model::Coordinate;
use crate::window::parse_hhmm;

pub const DEFAULT_DEPOT: Coordinate = Coordinate {
    lat: -32.91973,
    lng: -68.81829,
};

/// Immutable input to one generation run.
///
/// Field names match the wire format the dashboard sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Service time spent at every stop, in minutes.
    pub tiempo_espera_min: f64,
    pub deposito_lat: f64,
    pub deposito_lng: f64,
    /// Work day start, `HH:MM`.
    pub hora_desde: String,
    /// Work day end, `HH:MM`.
    pub hora_hasta: String,
    /// Legs longer than this (minutes) are avoided when a closer stop exists.
    pub evitar_saltos_min: f64,
    /// Buffer added to the final leg back to the depot, in minutes.
    pub vuelta_galpon_min: f64,
    pub proveedor_matrix: ProviderKind,
    pub utilizar_ventana: bool,
    pub distancia_max_km: f64,
    /// Rank `es_prioridad` stops ahead of plain ones among non-urgent stops.
    pub respetar_prioridad: bool,
    /// Let unclassified (`pendiente`) records into the run.
    pub incluir_sin_clasificar: bool,
    /// Minimum geocoder confidence; lower-confidence coordinates count as missing.
    pub confianza_min: Option<f64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            tiempo_espera_min: 10.0,
            deposito_lat: DEFAULT_DEPOT.lat,
            deposito_lng: DEFAULT_DEPOT.lng,
            hora_desde: "09:00".to_string(),
            hora_hasta: "14:00".to_string(),
            evitar_saltos_min: 25.0,
            vuelta_galpon_min: 25.0,
            proveedor_matrix: ProviderKind::Ors,
            utilizar_ventana: true,
            distancia_max_km: 45.0,
            respetar_prioridad: true,
            incluir_sin_clasificar: false,
            confianza_min: None,
        }
    }
}

impl GenerationConfig {
    pub fn depot(&self) -> Coordinate {
        Coordinate::new(self.deposito_lat, self.deposito_lng)
    }

    /// Work day as minutes from midnight, `(desde, hasta)`.
    pub fn work_day(&self) -> Result<(u32, u32), RouteError> {
        let desde = parse_hhmm(&self.hora_desde).ok_or_else(|| {
            RouteError::InvalidConfig(format!("hora_desde '{}' is not HH:MM", self.hora_desde))
        })?;
        let hasta = parse_hhmm(&self.hora_hasta).ok_or_else(|| {
            RouteError::InvalidConfig(format!("hora_hasta '{}' is not HH:MM", self.hora_hasta))
        })?;
        if desde >= hasta {
            return Err(RouteError::InvalidConfig(format!(
                "hora_desde {} must be before hora_hasta {}",
                self.hora_desde, self.hora_hasta
            )));
        }
        Ok((desde, hasta))
    }

    /// Checks every field; runs before any provider call.
    pub fn validate(&self) -> Result<(), RouteError> {
        self.work_day()?;

        let thresholds = [
            ("tiempo_espera_min", self.tiempo_espera_min),
            ("evitar_saltos_min", self.evitar_saltos_min),
            ("vuelta_galpon_min", self.vuelta_galpon_min),
            ("distancia_max_km", self.distancia_max_km),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(RouteError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        if !self.depot().is_valid() {
            return Err(RouteError::InvalidConfig(format!(
                "depot ({}, {}) is not a valid coordinate",
                self.deposito_lat, self.deposito_lng
            )));
        }

        if let Some(min) = self.confianza_min {
            if !(0.0..=1.0).contains(&min) {
                return Err(RouteError::InvalidConfig(format!(
                    "confianza_min must be within [0, 1], got {min}"
                )));
            }
        }

        Ok(())
    }
}

/// Credentials and endpoints for the HTTP distance providers.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub ors_api_key: Option<String>,
    pub ors_base_url: String,
    pub mapbox_token: Option<String>,
    pub mapbox_base_url: String,
    pub google_api_key: Option<String>,
    pub google_base_url: String,
    /// Per-request timeout; a timed-out request surfaces as `ProviderUnavailable`.
    pub timeout_secs: u64,
    /// Upper bound on concurrent chunk requests for size-limited providers.
    pub max_parallel: usize,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            ors_api_key: None,
            ors_base_url: "https://api.openrouteservice.org".to_string(),
            mapbox_token: None,
            mapbox_base_url: "https://api.mapbox.com".to_string(),
            google_api_key: None,
            google_base_url: "https://maps.googleapis.com".to_string(),
            timeout_secs: 30,
            max_parallel: 4,
        }
    }
}

impl ProviderSettings {
    /// Loads settings from the environment, reading `.env` when present.
    pub fn from_env() -> Result<Self, RouteError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let timeout_secs = match non_empty_var("DM_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                RouteError::InvalidConfig(format!("DM_TIMEOUT_SECS '{raw}' is not an integer"))
            })?,
            None => defaults.timeout_secs,
        };
        let max_parallel = match non_empty_var("DM_MAX_PARALLEL") {
            Some(raw) => raw.parse().map_err(|_| {
                RouteError::InvalidConfig(format!("DM_MAX_PARALLEL '{raw}' is not an integer"))
            })?,
            None => defaults.max_parallel,
        };

        Ok(Self {
            ors_api_key: non_empty_var("ORS_API_KEY"),
            ors_base_url: non_empty_var("ORS_BASE_URL").unwrap_or(defaults.ors_base_url),
            mapbox_token: non_empty_var("MAPBOX_TOKEN"),
            mapbox_base_url: non_empty_var("MAPBOX_BASE_URL").unwrap_or(defaults.mapbox_base_url),
            google_api_key: non_empty_var("GOOGLE_MAPS_API_KEY"),
            google_base_url: non_empty_var("GOOGLE_BASE_URL").unwrap_or(defaults.google_base_url),
            timeout_secs,
            max_parallel: max_parallel.max(1),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
