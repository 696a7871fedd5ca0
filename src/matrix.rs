//! Travel legs, provider selection and chunked lookups.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::google::{GoogleClient, GoogleConfig};
use crate::haversine::HaversineMatrix;
use crate::mapbox::{MapboxClient, MapboxConfig};
use crate::model::Coordinate;
use crate::ors::{OrsClient, OrsConfig};
use crate::traits::DistanceMatrixProvider;

/// Travel between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub duration_min: f64,
    pub distance_km: f64,
}

impl Leg {
    pub fn new(duration_min: f64, distance_km: f64) -> Self {
        Self {
            duration_min,
            distance_km,
        }
    }
}

/// Square matrix of legs; `None` where the provider found no route.
#[derive(Debug, Clone, PartialEq)]
pub struct TravelMatrix {
    rows: Vec<Vec<Option<Leg>>>,
}

impl TravelMatrix {
    pub fn new(rows: Vec<Vec<Option<Leg>>>) -> Self {
        Self { rows }
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, from: usize, to: usize) -> Option<Leg> {
        self.rows.get(from)?.get(to).copied().flatten()
    }
}

/// Which distance service a run uses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// openrouteservice, a routing-graph service.
    #[default]
    Ors,
    Mapbox,
    Google,
    /// Offline great-circle estimate.
    Haversine,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ors => "ors",
            ProviderKind::Mapbox => "mapbox",
            ProviderKind::Google => "google",
            ProviderKind::Haversine => "haversine",
        }
    }
}

/// Builds the provider a config selects.
pub fn build_provider(
    kind: ProviderKind,
    settings: &ProviderSettings,
) -> Result<Box<dyn DistanceMatrixProvider>, ProviderError> {
    let provider: Box<dyn DistanceMatrixProvider> = match kind {
        ProviderKind::Ors => Box::new(OrsClient::new(OrsConfig::from_settings(settings)?)?),
        ProviderKind::Mapbox => {
            Box::new(MapboxClient::new(MapboxConfig::from_settings(settings)?)?)
        }
        ProviderKind::Google => {
            Box::new(GoogleClient::new(GoogleConfig::from_settings(settings)?)?)
        }
        ProviderKind::Haversine => Box::new(HaversineMatrix::default()),
    };
    Ok(provider)
}

/// Rejects invalid coordinates before any request goes out.
pub(crate) fn validate_all(
    origin: Coordinate,
    destinations: &[Coordinate],
) -> Result<(), ProviderError> {
    origin.validate()?;
    destinations.iter().try_for_each(Coordinate::validate)
}

/// Thread pool capped at `max_parallel` workers for chunked requests.
pub(crate) fn bounded_pool(
    provider: &str,
    max_parallel: usize,
) -> Result<rayon::ThreadPool, ProviderError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(max_parallel.max(1))
        .thread_name(move |i| format!("dm-{i}"))
        .build()
        .map_err(|err| ProviderError::unavailable(provider, err.to_string()))
}

/// Splits `destinations` into chunks of at most `chunk_size`, fetches the
/// chunks on `pool`, and reassembles the legs in destination order.
///
/// Chunk completion order never leaks into the result; on failure the error
/// of the first failing chunk (in destination order) is returned.
pub(crate) fn fan_out<F>(
    pool: &rayon::ThreadPool,
    provider: &str,
    destinations: &[Coordinate],
    chunk_size: usize,
    fetch: F,
) -> Result<Vec<Option<Leg>>, ProviderError>
where
    F: Fn(&[Coordinate]) -> Result<Vec<Option<Leg>>, ProviderError> + Sync,
{
    if destinations.is_empty() {
        return Ok(Vec::new());
    }
    let chunk_size = chunk_size.max(1);
    if destinations.len() <= chunk_size {
        return checked(provider, destinations.len(), fetch(destinations));
    }

    let chunks: Vec<&[Coordinate]> = destinations.chunks(chunk_size).collect();
    tracing::debug!(
        provider,
        chunks = chunks.len(),
        destinations = destinations.len(),
        "fanning out distance lookup"
    );

    let results: Vec<Result<Vec<Option<Leg>>, ProviderError>> = pool.install(|| {
        chunks
            .par_iter()
            .map(|chunk| checked(provider, chunk.len(), fetch(chunk)))
            .collect()
    });

    let mut legs = Vec::with_capacity(destinations.len());
    for result in results {
        legs.extend(result?);
    }
    Ok(legs)
}

fn checked(
    provider: &str,
    expected: usize,
    result: Result<Vec<Option<Leg>>, ProviderError>,
) -> Result<Vec<Option<Leg>>, ProviderError> {
    let legs = result?;
    if legs.len() != expected {
        return Err(ProviderError::unavailable(
            provider,
            format!("expected {expected} legs, got {}", legs.len()),
        ));
    }
    Ok(legs)
}
