//! Decides which delivery records may enter the sequencer.

use std::collections::HashSet;

use crate::config::GenerationConfig;
use crate::error::RouteError;
use crate::exclusions::ExclusionRecorder;
use crate::haversine::haversine_km;
use crate::model::{Classification, DeliveryCandidate, ExclusionReason};

/// Whether a record's classification lets it into a run at all.
///
/// Records that fail this gate are not part of the run's candidate set and
/// produce no exclusion.
pub fn admits_classification(candidate: &DeliveryCandidate, config: &GenerationConfig) -> bool {
    match candidate.estado_clasificacion {
        Classification::Enviar => true,
        Classification::Pendiente => config.incluir_sin_clasificar,
        _ => false,
    }
}

/// Selects the run's candidate set from a snapshot, in snapshot order.
///
/// Repeated ids keep their first occurrence.
pub fn candidate_set(
    snapshot: Vec<DeliveryCandidate>,
    config: &GenerationConfig,
) -> Vec<DeliveryCandidate> {
    let mut seen = HashSet::new();
    snapshot
        .into_iter()
        .filter(|candidate| admits_classification(candidate, config))
        .filter(|candidate| {
            let fresh = seen.insert(candidate.id);
            if !fresh {
                tracing::warn!(remito = %candidate.numero, "duplicate candidate id ignored");
            }
            fresh
        })
        .collect()
}

/// Applies the eligibility policy, recording every dropped candidate.
///
/// In order: missing (or low-confidence) geocode, window outside the work day
/// (only when windows are enforced), and distance from depot over the limit.
pub fn filter_eligible(
    candidates: Vec<DeliveryCandidate>,
    config: &GenerationConfig,
    recorder: &mut ExclusionRecorder,
) -> Result<Vec<DeliveryCandidate>, RouteError> {
    let (day_from, day_to) = config.work_day()?;
    let depot = config.depot();
    let total = candidates.len();
    let mut eligible = Vec::with_capacity(total);

    for candidate in candidates {
        let Some(coordinate) = usable_coordinate(&candidate, config) else {
            recorder.record(&candidate, ExclusionReason::SinGeocodificar)?;
            continue;
        };

        if config.utilizar_ventana {
            let fits = candidate
                .effective_window()
                .is_none_or(|window| window.intersects(day_from, day_to));
            if !fits {
                recorder.record(&candidate, ExclusionReason::FueraDeVentana)?;
                continue;
            }
        }

        if haversine_km(depot, coordinate) > config.distancia_max_km {
            recorder.record(&candidate, ExclusionReason::DistanciaExcesiva)?;
            continue;
        }

        eligible.push(candidate);
    }

    tracing::info!(
        total,
        eligible = eligible.len(),
        excluded = total - eligible.len(),
        "eligibility filter applied"
    );
    Ok(eligible)
}

fn usable_coordinate(
    candidate: &DeliveryCandidate,
    config: &GenerationConfig,
) -> Option<crate::model::Coordinate> {
    let coordinate = candidate.coordenada.filter(|c| c.is_valid())?;
    match (config.confianza_min, candidate.confianza_geocodificacion) {
        (Some(min), Some(confidence)) if confidence < min => None,
        _ => Some(coordinate),
    }
}
