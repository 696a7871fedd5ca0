//! Test fixtures for ruteo.
//!
//! Provides realistic test data including:
//! - Gran Mendoza locations
//! - A builder for delivery candidates
//! - Distance providers that fail or count their calls

#![allow(dead_code)]

pub mod mendoza_locations;

use std::sync::atomic::{AtomicUsize, Ordering};

use ruteo::haversine::HaversineMatrix;
use ruteo::{
    Classification, Coordinate, DeliveryCandidate, DistanceMatrixProvider, Leg, ProviderError,
    TimeWindow,
};

pub use mendoza_locations::*;

// ============================================================================
// Candidate builder
// ============================================================================

/// Builder for delivery candidates with sensible defaults: classified as
/// ready to send, no window, no flags.
#[derive(Clone, Debug)]
pub struct TestCandidate {
    candidate: DeliveryCandidate,
}

impl TestCandidate {
    pub fn new(id: u64) -> Self {
        Self {
            candidate: DeliveryCandidate::new(id),
        }
    }

    pub fn at(mut self, location: &Location) -> Self {
        self.candidate.coordenada = Some(Coordinate::new(location.lat, location.lng));
        self.candidate.direccion = location.name.to_string();
        self
    }

    pub fn coords(mut self, lat: f64, lng: f64) -> Self {
        self.candidate.coordenada = Some(Coordinate::new(lat, lng));
        self
    }

    pub fn urgent(mut self) -> Self {
        self.candidate.es_urgente = true;
        self
    }

    pub fn priority(mut self) -> Self {
        self.candidate.es_prioridad = true;
        self
    }

    pub fn window(mut self, desde_min: u32, hasta_min: u32) -> Self {
        self.candidate.ventana = Some(TimeWindow::between(desde_min, hasta_min));
        self
    }

    pub fn notes(mut self, text: &str) -> Self {
        self.candidate.observaciones = Some(text.to_string());
        self
    }

    pub fn classified(mut self, state: Classification) -> Self {
        self.candidate.estado_clasificacion = state;
        self
    }

    pub fn build(self) -> DeliveryCandidate {
        self.candidate
    }
}

/// One ready candidate per city location, ids starting at 1.
pub fn city_candidates() -> Vec<DeliveryCandidate> {
    CITY.iter()
        .enumerate()
        .map(|(i, location)| TestCandidate::new(i as u64 + 1).at(location).build())
        .collect()
}

pub fn hours(h: u32) -> u32 {
    h * 60
}

// ============================================================================
// Providers
// ============================================================================

/// Fails every lookup the way a timed-out HTTP provider does.
pub struct TimeoutProvider;

impl DistanceMatrixProvider for TimeoutProvider {
    fn name(&self) -> &str {
        "ors"
    }

    fn legs_from(
        &self,
        _origin: Coordinate,
        _destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        Err(ProviderError::unavailable("ors", "timeout: operation timed out"))
    }
}

/// Haversine estimates under a configurable provider name, counting calls.
pub struct CountingProvider {
    name: &'static str,
    inner: HaversineMatrix,
    calls: AtomicUsize,
    pairs: AtomicUsize,
}

impl CountingProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            inner: HaversineMatrix::default(),
            calls: AtomicUsize::new(0),
            pairs: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn pairs(&self) -> usize {
        self.pairs.load(Ordering::SeqCst)
    }
}

impl DistanceMatrixProvider for CountingProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pairs.fetch_add(destinations.len(), Ordering::SeqCst);
        self.inner.legs_from(origin, destinations)
    }
}

/// Answers every lookup but has no route to the listed coordinates.
pub struct UnreachableProvider {
    pub unreachable: Vec<Coordinate>,
}

impl DistanceMatrixProvider for UnreachableProvider {
    fn name(&self) -> &str {
        "mapbox"
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        let legs = HaversineMatrix::default().legs_from(origin, destinations)?;
        Ok(destinations
            .iter()
            .zip(legs)
            .map(|(to, leg)| leg.filter(|_| !self.unreachable.contains(to)))
            .collect())
    }
}
