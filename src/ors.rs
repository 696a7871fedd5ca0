//! openrouteservice matrix adapter.

use serde::{Deserialize, Serialize};

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::matrix::{Leg, bounded_pool, fan_out, validate_all};
use crate::model::Coordinate;
use crate::traits::DistanceMatrixProvider;

const NAME: &str = "ors";

/// Destinations per request; keeps sources x destinations under the plan limit.
const MAX_DESTINATIONS: usize = 3000;

#[derive(Debug, Clone)]
pub struct OrsConfig {
    pub base_url: String,
    pub api_key: String,
    pub profile: String,
    pub timeout_secs: u64,
    pub max_parallel: usize,
}

impl Default for OrsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openrouteservice.org".to_string(),
            api_key: String::new(),
            profile: "driving-car".to_string(),
            timeout_secs: 30,
            max_parallel: 4,
        }
    }
}

impl OrsConfig {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .ors_api_key
            .clone()
            .ok_or_else(|| ProviderError::unavailable(NAME, "ORS_API_KEY not configured"))?;
        Ok(Self {
            base_url: settings.ors_base_url.clone(),
            api_key,
            timeout_secs: settings.timeout_secs,
            max_parallel: settings.max_parallel,
            ..Self::default()
        })
    }
}

pub struct OrsClient {
    config: OrsConfig,
    client: reqwest::blocking::Client,
    pool: rayon::ThreadPool,
}

impl OrsClient {
    pub fn new(config: OrsConfig) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| ProviderError::from_http(NAME, err))?;
        let pool = bounded_pool(NAME, config.max_parallel)?;

        Ok(Self {
            config,
            client,
            pool,
        })
    }

    fn fetch(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        let request = OrsMatrixRequest::one_to_many(origin, destinations);
        let url = format!(
            "{}/v2/matrix/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.profile
        );

        tracing::debug!(destinations = destinations.len(), "requesting ors matrix");

        let body = self
            .client
            .post(url)
            .header("Authorization", &self.config.api_key)
            .json(&request)
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<OrsMatrixResponse>())
            .map_err(|err| ProviderError::from_http(NAME, err))?;

        parse_response(body, destinations.len())
    }
}

impl DistanceMatrixProvider for OrsClient {
    fn name(&self) -> &str {
        NAME
    }

    fn legs_from(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<Leg>>, ProviderError> {
        validate_all(origin, destinations)?;
        fan_out(&self.pool, NAME, destinations, MAX_DESTINATIONS, |chunk| {
            self.fetch(origin, chunk)
        })
    }
}

/// Matrix request with the origin at index 0 and destinations after it.
#[derive(Debug, Serialize)]
struct OrsMatrixRequest {
    /// `[lng, lat]` pairs.
    locations: Vec<[f64; 2]>,
    sources: Vec<usize>,
    destinations: Vec<usize>,
    metrics: Vec<&'static str>,
    units: &'static str,
}

impl OrsMatrixRequest {
    fn one_to_many(origin: Coordinate, destinations: &[Coordinate]) -> Self {
        let locations = std::iter::once(origin)
            .chain(destinations.iter().copied())
            .map(|c| [c.lng, c.lat])
            .collect();
        Self {
            locations,
            sources: vec![0],
            destinations: (1..=destinations.len()).collect(),
            metrics: vec!["duration", "distance"],
            units: "km",
        }
    }
}

#[derive(Debug, Deserialize)]
struct OrsMatrixResponse {
    /// Seconds.
    durations: Option<Vec<Vec<Option<f64>>>>,
    /// Kilometers (requested `units`).
    distances: Option<Vec<Vec<Option<f64>>>>,
}

fn parse_response(
    body: OrsMatrixResponse,
    expected: usize,
) -> Result<Vec<Option<Leg>>, ProviderError> {
    let durations = first_row(body.durations, "durations")?;
    let distances = first_row(body.distances, "distances")?;
    if durations.len() != expected || distances.len() != expected {
        return Err(ProviderError::unavailable(
            NAME,
            format!("expected {expected} columns, got {}", durations.len()),
        ));
    }

    Ok(durations
        .into_iter()
        .zip(distances)
        .map(|(secs, km)| match (secs, km) {
            (Some(secs), Some(km)) => Some(Leg::new(secs / 60.0, km)),
            _ => None,
        })
        .collect())
}

fn first_row(
    rows: Option<Vec<Vec<Option<f64>>>>,
    field: &str,
) -> Result<Vec<Option<f64>>, ProviderError> {
    rows.and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| ProviderError::unavailable(NAME, format!("response missing {field}")))
}
