//! Stop sequencer: orders eligible candidates into one depot-to-depot route.
//!
//! Nearest-feasible-next with an urgency override. Every step looks up travel
//! from the current position to all remaining candidates in one provider call
//! and reduces a ranked candidate list:
//!
//! 1. urgent and feasible, nearest first;
//! 2. otherwise non-urgent and feasible, priority tier first when enabled,
//!    replaced by the nearest stop within `evitar_saltos_min` when the pick
//!    would be a big jump;
//! 3. if nothing is feasible, the candidate missing its window by the least is
//!    excluded as `ventana_incompatible` and the step is retried;
//! 4. if nothing is even reachable, everything left is `sin_ruta_factible`.
//!
//! Ties on travel duration go to the lower candidate id.

use std::cmp::Ordering as CmpOrdering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::GenerationConfig;
use crate::error::{ProviderError, RouteError, Stage};
use crate::exclusions::ExclusionRecorder;
use crate::matrix::Leg;
use crate::model::{Coordinate, DeliveryCandidate, ExclusionReason, Stop, StopStatus, round1};
use crate::traits::DistanceMatrixProvider;
use crate::window::Franja;

/// Shared flag that aborts an in-flight generation.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), RouteError> {
        if self.is_cancelled() {
            Err(RouteError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Ordered stops plus run totals.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedRoute {
    pub stops: Vec<Stop>,
    /// Travel from the last stop back to the depot, without the buffer.
    pub return_leg: Option<Leg>,
    pub total_duration_min: f64,
    pub total_distance_km: f64,
}

#[derive(Debug, Clone)]
struct Pending {
    candidate: DeliveryCandidate,
    coordinate: Coordinate,
    /// Latest arrival (minutes from midnight) when windows are enforced.
    latest: Option<f64>,
    franja: Franja,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Selection {
    Place(usize, Leg),
    ExcludeLate(usize),
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
struct Choice {
    idx: usize,
    id: u64,
    leg: Leg,
    urgent: bool,
    priority: bool,
}

/// Transient state of one run; dropped whole on failure.
struct RouteBuilder<'a> {
    config: &'a GenerationConfig,
    day_start: f64,
    position: Coordinate,
    elapsed_min: f64,
    distance_km: f64,
    stops: Vec<Stop>,
}

impl RouteBuilder<'_> {
    fn place(&mut self, pending: Pending, leg: Leg) {
        self.elapsed_min += leg.duration_min + self.config.tiempo_espera_min;
        self.distance_km += leg.distance_km;
        self.position = pending.coordinate;

        let candidate = pending.candidate;
        tracing::debug!(
            orden = self.stops.len() + 1,
            remito = %candidate.numero,
            minutos = leg.duration_min,
            urgente = candidate.es_urgente,
            "stop placed"
        );

        self.stops.push(Stop {
            orden: self.stops.len() + 1,
            remito_id: candidate.id,
            remito_numero: candidate.numero,
            cliente: candidate.cliente,
            direccion: candidate.direccion,
            lat: pending.coordinate.lat,
            lng: pending.coordinate.lng,
            minutos_desde_anterior: round1(leg.duration_min),
            distancia_desde_anterior_km: round1(leg.distance_km),
            tiempo_espera_min: self.config.tiempo_espera_min,
            minutos_acumulados: round1(self.elapsed_min),
            es_urgente: candidate.es_urgente,
            es_prioridad: candidate.es_prioridad,
            ventana_tipo: pending.franja,
            estado: StopStatus::Pendiente,
        });
    }

    fn now(&self) -> f64 {
        self.day_start + self.elapsed_min
    }
}

/// Sequences `candidates` (already filtered, in snapshot order) into a route.
///
/// Candidates without a coordinate are recorded as `sin_geocodificar` rather
/// than placed. Any provider failure fails the whole run.
pub fn sequence<P>(
    candidates: Vec<DeliveryCandidate>,
    config: &GenerationConfig,
    provider: &P,
    recorder: &mut ExclusionRecorder,
    cancel: &CancelFlag,
) -> Result<SequencedRoute, RouteError>
where
    P: DistanceMatrixProvider + ?Sized,
{
    let (day_start, _) = config.work_day()?;
    let depot = config.depot();

    let mut remaining = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let Some(coordinate) = candidate.coordenada.filter(Coordinate::is_valid) else {
            recorder.record(&candidate, ExclusionReason::SinGeocodificar)?;
            continue;
        };
        let window = candidate.effective_window();
        let latest = window
            .as_ref()
            .filter(|_| config.utilizar_ventana)
            .and_then(|w| w.bounds())
            .map(|(_, hasta)| f64::from(hasta));
        remaining.push(Pending {
            franja: window.map(|w| w.franja).unwrap_or_default(),
            candidate,
            coordinate,
            latest,
        });
    }

    let mut builder = RouteBuilder {
        config,
        day_start: f64::from(day_start),
        position: depot,
        elapsed_min: 0.0,
        distance_km: 0.0,
        stops: Vec::with_capacity(remaining.len()),
    };

    // Legs from the current position, aligned with `remaining`; reused while
    // the position does not move.
    let mut legs: Option<Vec<Option<Leg>>> = None;

    while !remaining.is_empty() {
        let current = match legs.take() {
            Some(current) => current,
            None => {
                cancel.check()?;
                let destinations: Vec<Coordinate> =
                    remaining.iter().map(|p| p.coordinate).collect();
                let fetched = provider
                    .legs_from(builder.position, &destinations)
                    .map_err(|cause| failed(Stage::Sequencer, cause))?;
                if fetched.len() != destinations.len() {
                    return Err(failed(
                        Stage::Sequencer,
                        ProviderError::unavailable(
                            provider.name(),
                            format!("expected {} legs, got {}", destinations.len(), fetched.len()),
                        ),
                    ));
                }
                fetched
            }
        };

        match select(&remaining, &current, builder.now(), config) {
            Selection::Place(idx, leg) => {
                let pending = remaining.remove(idx);
                builder.place(pending, leg);
            }
            Selection::ExcludeLate(idx) => {
                let pending = remaining.remove(idx);
                recorder.record(&pending.candidate, ExclusionReason::VentanaIncompatible)?;
                let mut current = current;
                current.remove(idx);
                legs = Some(current);
            }
            Selection::Exhausted => {
                tracing::warn!(
                    remaining = remaining.len(),
                    "no reachable candidate left"
                );
                for pending in remaining.drain(..) {
                    recorder.record(&pending.candidate, ExclusionReason::SinRutaFactible)?;
                }
            }
        }
    }

    let return_leg = if builder.stops.is_empty() {
        None
    } else {
        cancel.check()?;
        let leg = provider
            .pair(builder.position, depot)
            .map_err(|cause| failed(Stage::ReturnLeg, cause))?
            .ok_or_else(|| {
                failed(
                    Stage::ReturnLeg,
                    ProviderError::unavailable(provider.name(), "no route back to depot"),
                )
            })?;
        Some(leg)
    };

    let (total_duration, total_distance) = match return_leg {
        Some(leg) => (
            builder.elapsed_min + leg.duration_min + config.vuelta_galpon_min,
            builder.distance_km + leg.distance_km,
        ),
        None => (0.0, 0.0),
    };

    tracing::info!(
        stops = builder.stops.len(),
        duration_min = round1(total_duration),
        distance_km = round1(total_distance),
        "route sequenced"
    );

    Ok(SequencedRoute {
        stops: builder.stops,
        return_leg,
        total_duration_min: round1(total_duration),
        total_distance_km: round1(total_distance),
    })
}

fn failed(stage: Stage, cause: ProviderError) -> RouteError {
    tracing::warn!(%stage, error = %cause, "distance lookup failed");
    RouteError::RouteGenerationFailed { stage, cause }
}

/// One selection step over the remaining candidates.
fn select(
    remaining: &[Pending],
    legs: &[Option<Leg>],
    now: f64,
    config: &GenerationConfig,
) -> Selection {
    let mut feasible = Vec::new();
    let mut late: Vec<(usize, u64, f64)> = Vec::new();

    for (idx, (pending, leg)) in remaining.iter().zip(legs).enumerate() {
        let Some(leg) = leg else { continue };
        let arrival = now + leg.duration_min;
        match pending.latest {
            Some(latest) if arrival > latest => {
                late.push((idx, pending.candidate.id, arrival - latest));
            }
            _ => feasible.push(Choice {
                idx,
                id: pending.candidate.id,
                leg: *leg,
                urgent: pending.candidate.es_urgente,
                priority: pending.candidate.es_prioridad,
            }),
        }
    }

    if feasible.is_empty() {
        return late
            .into_iter()
            .min_by(|a, b| a.2.total_cmp(&b.2).then(a.1.cmp(&b.1)))
            .map(|(idx, _, _)| Selection::ExcludeLate(idx))
            .unwrap_or(Selection::Exhausted);
    }

    if let Some(urgent) = nearest(feasible.iter().filter(|o| o.urgent)) {
        return Selection::Place(urgent.idx, urgent.leg);
    }

    let ranked = if config.respetar_prioridad {
        nearest(feasible.iter().filter(|o| o.priority)).or_else(|| nearest(feasible.iter()))
    } else {
        nearest(feasible.iter())
    };
    let Some(ranked) = ranked else {
        return Selection::Exhausted;
    };

    if ranked.leg.duration_min > config.evitar_saltos_min {
        let closer = nearest(
            feasible
                .iter()
                .filter(|o| o.idx != ranked.idx && o.leg.duration_min <= config.evitar_saltos_min),
        );
        if let Some(closer) = closer {
            tracing::debug!(
                skipped = ranked.id,
                chosen = closer.id,
                "big jump avoided"
            );
            return Selection::Place(closer.idx, closer.leg);
        }
    }

    Selection::Place(ranked.idx, ranked.leg)
}

fn nearest<'o>(options: impl Iterator<Item = &'o Choice>) -> Option<&'o Choice> {
    options.min_by(|a, b| by_duration_then_id(a, b))
}

fn by_duration_then_id(a: &Choice, b: &Choice) -> CmpOrdering {
    a.leg
        .duration_min
        .total_cmp(&b.leg.duration_min)
        .then(a.id.cmp(&b.id))
}
