//! Accumulates candidates dropped from a run.

use std::collections::HashSet;

use crate::error::RouteError;
use crate::haversine::haversine_km;
use crate::model::{Coordinate, DeliveryCandidate, Exclusion, ExclusionReason, round1};

/// Append-only list of exclusions for one run; a candidate is recorded at most once.
#[derive(Debug, Clone)]
pub struct ExclusionRecorder {
    depot: Coordinate,
    entries: Vec<Exclusion>,
    seen: HashSet<u64>,
}

impl ExclusionRecorder {
    pub fn new(depot: Coordinate) -> Self {
        Self {
            depot,
            entries: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn record(
        &mut self,
        candidate: &DeliveryCandidate,
        reason: ExclusionReason,
    ) -> Result<(), RouteError> {
        if !self.seen.insert(candidate.id) {
            return Err(RouteError::DuplicateExclusion(candidate.numero.clone()));
        }

        let distancia_km = candidate
            .coordenada
            .filter(Coordinate::is_valid)
            .map(|c| round1(haversine_km(self.depot, c)));

        tracing::debug!(
            remito = %candidate.numero,
            motivo = reason.as_str(),
            "candidate excluded"
        );

        self.entries.push(Exclusion {
            remito_id: candidate.id,
            remito_numero: candidate.numero.clone(),
            cliente: candidate.cliente.clone(),
            motivo: reason,
            distancia_km,
        });
        Ok(())
    }

    pub fn contains(&self, candidate_id: u64) -> bool {
        self.seen.contains(&candidate_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Exclusion] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Exclusion> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depot() -> Coordinate {
        Coordinate::new(-32.91973, -68.81829)
    }

    #[test]
    fn test_records_distance_when_geocoded() {
        let mut recorder = ExclusionRecorder::new(depot());
        let mut candidate = DeliveryCandidate::new(7);
        candidate.coordenada = Some(Coordinate::new(-32.91973, -68.81829));
        recorder
            .record(&candidate, ExclusionReason::FueraDeVentana)
            .unwrap();

        let entry = &recorder.entries()[0];
        assert_eq!(entry.remito_id, 7);
        assert_eq!(entry.motivo, ExclusionReason::FueraDeVentana);
        assert_eq!(entry.distancia_km, Some(0.0));
    }

    #[test]
    fn test_no_distance_without_coordinate() {
        let mut recorder = ExclusionRecorder::new(depot());
        recorder
            .record(&DeliveryCandidate::new(1), ExclusionReason::SinGeocodificar)
            .unwrap();
        assert_eq!(recorder.entries()[0].distancia_km, None);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let mut recorder = ExclusionRecorder::new(depot());
        let candidate = DeliveryCandidate::new(3);
        recorder
            .record(&candidate, ExclusionReason::SinGeocodificar)
            .unwrap();
        let err = recorder
            .record(&candidate, ExclusionReason::SinRutaFactible)
            .unwrap_err();
        assert_eq!(err, RouteError::DuplicateExclusion("R-3".to_string()));
        assert_eq!(recorder.len(), 1);
        assert!(recorder.contains(3));
    }
}
