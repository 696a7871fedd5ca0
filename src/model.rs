//! Route data model: candidates going in, runs coming out.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::error::{ProviderError, RouteError};
use crate::polyline::Polyline;
use crate::window::{Franja, TimeWindow, classify_observation};

/// A (latitude, longitude) point in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Rejects out-of-range or non-finite coordinates before they reach a provider.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ProviderError::InvalidCoordinate {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Classification state of a delivery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Not yet classified.
    #[default]
    Pendiente,
    /// Ready to send.
    Enviar,
    Corregir,
    RetiroSospechado,
    TransporteExterno,
    NoEncontrado,
    Excluido,
}

/// A delivery record ("remito") that may be routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryCandidate {
    pub id: u64,
    #[serde(default)]
    pub numero: String,
    #[serde(default)]
    pub cliente: String,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub coordenada: Option<Coordinate>,
    /// Geocoder confidence in `[0, 1]`, when the geocoder reported one.
    #[serde(default)]
    pub confianza_geocodificacion: Option<f64>,
    #[serde(default)]
    pub es_urgente: bool,
    #[serde(default)]
    pub es_prioridad: bool,
    /// Explicit window; takes precedence over `observaciones`.
    #[serde(default)]
    pub ventana: Option<TimeWindow>,
    /// Free-text delivery notes, classified into a window when `ventana` is absent.
    #[serde(default)]
    pub observaciones: Option<String>,
    #[serde(default)]
    pub estado_clasificacion: Classification,
}

impl DeliveryCandidate {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            numero: format!("R-{id}"),
            cliente: String::new(),
            direccion: String::new(),
            coordenada: None,
            confianza_geocodificacion: None,
            es_urgente: false,
            es_prioridad: false,
            ventana: None,
            observaciones: None,
            estado_clasificacion: Classification::Enviar,
        }
    }

    /// The window this candidate must be served in, if any.
    pub fn effective_window(&self) -> Option<TimeWindow> {
        match &self.ventana {
            Some(window) => Some(window.clone()),
            None => self.observaciones.as_deref().map(classify_observation),
        }
    }
}

/// Why a candidate was left out of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    SinGeocodificar,
    FueraDeVentana,
    DistanciaExcesiva,
    VentanaIncompatible,
    SinRutaFactible,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::SinGeocodificar => "sin_geocodificar",
            ExclusionReason::FueraDeVentana => "fuera_de_ventana",
            ExclusionReason::DistanciaExcesiva => "distancia_excesiva",
            ExclusionReason::VentanaIncompatible => "ventana_incompatible",
            ExclusionReason::SinRutaFactible => "sin_ruta_factible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    pub remito_id: u64,
    pub remito_numero: String,
    pub cliente: String,
    pub motivo: ExclusionReason,
    /// Straight-line distance from depot, when the candidate had a coordinate.
    pub distancia_km: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopStatus {
    #[default]
    Pendiente,
    Entregado,
}

/// One candidate placed into a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// 1-based, contiguous within a run.
    pub orden: usize,
    pub remito_id: u64,
    pub remito_numero: String,
    pub cliente: String,
    pub direccion: String,
    pub lat: f64,
    pub lng: f64,
    pub minutos_desde_anterior: f64,
    pub distancia_desde_anterior_km: f64,
    pub tiempo_espera_min: f64,
    pub minutos_acumulados: f64,
    pub es_urgente: bool,
    pub es_prioridad: bool,
    pub ventana_tipo: Franja,
    pub estado: StopStatus,
}

impl Stop {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Borrador,
    Confirmada,
    EnCurso,
    Completada,
    Cancelada,
}

impl RouteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Borrador => "borrador",
            RouteStatus::Confirmada => "confirmada",
            RouteStatus::EnCurso => "en_curso",
            RouteStatus::Completada => "completada",
            RouteStatus::Cancelada => "cancelada",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteStatus::Completada | RouteStatus::Cancelada)
    }

    fn rank(&self) -> u8 {
        match self {
            RouteStatus::Borrador => 0,
            RouteStatus::Confirmada => 1,
            RouteStatus::EnCurso => 2,
            RouteStatus::Completada => 3,
            RouteStatus::Cancelada => 4,
        }
    }

    /// Forward-only transitions; cancellation from any non-terminal status.
    pub fn can_transition_to(&self, next: RouteStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            RouteStatus::Cancelada => true,
            RouteStatus::Borrador => false,
            other => other.rank() > self.rank(),
        }
    }
}

/// One route generation attempt that completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRun {
    /// Assigned when the run is archived.
    pub id: Option<u64>,
    pub trace_id: String,
    pub fecha: NaiveDate,
    pub estado: RouteStatus,
    pub total_paradas: usize,
    pub total_excluidos: usize,
    pub duracion_estimada_min: f64,
    pub distancia_total_km: f64,
    pub gmaps_links: Vec<String>,
    /// Whole-route links, at most ten waypoints each.
    #[serde(default)]
    pub gmaps_overview_links: Vec<String>,
    pub paradas: Vec<Stop>,
    pub excluidos: Vec<Exclusion>,
    pub config: GenerationConfig,
    pub geometria: Polyline,
    pub api_cost_estimate: f64,
    pub created_at: DateTime<Utc>,
}

impl RouteRun {
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            id: self.id,
            fecha: self.fecha,
            estado: self.estado,
            total_paradas: self.total_paradas,
            total_excluidos: self.total_excluidos,
            duracion_estimada_min: self.duracion_estimada_min,
            distancia_total_km: self.distancia_total_km,
            api_cost_estimate: self.api_cost_estimate,
            created_at: self.created_at,
        }
    }

    pub fn transition(&mut self, next: RouteStatus) -> Result<(), RouteError> {
        if !self.estado.can_transition_to(next) {
            return Err(RouteError::InvalidTransition {
                from: self.estado.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.estado = next;
        Ok(())
    }
}

/// Read-only list projection of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub id: Option<u64>,
    pub fecha: NaiveDate,
    pub estado: RouteStatus,
    pub total_paradas: usize,
    pub total_excluidos: usize,
    pub duracion_estimada_min: f64,
    pub distancia_total_km: f64,
    pub api_cost_estimate: f64,
    pub created_at: DateTime<Utc>,
}

/// Rounds to one decimal, the precision runs are reported in.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(-32.9, -68.8).is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, f64::NAN).is_valid());
        assert_eq!(
            Coordinate::new(0.0, 200.0).validate(),
            Err(ProviderError::InvalidCoordinate { lat: 0.0, lng: 200.0 })
        );
    }

    #[test]
    fn test_status_transitions_are_monotonic() {
        use RouteStatus::*;
        assert!(Borrador.can_transition_to(Confirmada));
        assert!(Confirmada.can_transition_to(EnCurso));
        assert!(EnCurso.can_transition_to(Completada));
        assert!(!EnCurso.can_transition_to(Confirmada));
        assert!(!Confirmada.can_transition_to(Borrador));
    }

    #[test]
    fn test_cancellation_only_from_non_terminal() {
        use RouteStatus::*;
        assert!(Borrador.can_transition_to(Cancelada));
        assert!(EnCurso.can_transition_to(Cancelada));
        assert!(!Completada.can_transition_to(Cancelada));
        assert!(!Cancelada.can_transition_to(Borrador));
    }

    #[test]
    fn test_exclusion_reason_wire_names() {
        let json = serde_json::to_string(&ExclusionReason::DistanciaExcesiva).unwrap();
        assert_eq!(json, "\"distancia_excesiva\"");
        assert_eq!(ExclusionReason::SinRutaFactible.as_str(), "sin_ruta_factible");
    }

    #[test]
    fn test_explicit_window_wins_over_observations() {
        let mut candidate = DeliveryCandidate::new(1);
        candidate.observaciones = Some("TARDE".to_string());
        candidate.ventana = Some(TimeWindow::between(9 * 60, 11 * 60));
        let window = candidate.effective_window().unwrap();
        assert_eq!(window.desde_min, Some(9 * 60));
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(12.345), 12.3);
        assert_eq!(round1(0.05), 0.1);
    }
}
