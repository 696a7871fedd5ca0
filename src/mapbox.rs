//! Mapbox Matrix API adapter.
//!
//! The API accepts at most 25 coordinates per request, so larger lookups are
//! split into chunks and issued concurrently.

use serde::Deserialize;

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::matrix::{Leg, bounded_pool, fan_out, validate_all};
use crate::model::Coordinate;
use crate::traits::DistanceMatrixProvider;

const NAME: &str = "mapbox";

/// 25 coordinates per request, one of them the origin.
const MAX_DESTINATIONS: usize = 24;

#[derive(Debug, Clone)]
pub struct MapboxConfig {
    pub base_url: String,
    pub access_token: String,
    pub profile: String,
    pub timeout_secs: u64,
    pub max_parallel: usize,
}

impl Default for MapboxConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.mapbox.com".to_string(),
            access_token: String::new(),
            profile: "mapbox/driving".to_string(),
            timeout_secs: 30,
            max_parallel: 4,
        }
    }
}

impl MapboxConfig {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let access_token = settings
            .mapbox_token
            .clone()
            .ok_or_else(|| ProviderError::unavailable(NAME, "MAPBOX_TOKEN not configured"))?;
        Ok(Self {
            base_url: settings.mapbox_base_url.clone(),
            access_token,
            timeout_secs: settings.timeout_secs,
            max_parallel: settings.max_parallel,
            ..Self::default()
        })
    }
}

pub struct MapboxClient {
    config: MapboxConfig,
    client: reqwest::blocking::Client,
    pool: rayon::ThreadPool,
}

impl MapboxClient {
    pub fn new(config: MapboxConfig) -> Result<Self, ProviderError> {
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
        let url = matrix_url(&self.config, origin, destinations);
        let destination_idx = (1..=destinations.len())
            .map(|i| i.to_string())
            .collect::<Vec<_>>()
            .join(";");

        tracing::debug!(destinations = destinations.len(), "requesting mapbox matrix");

        let body = self
            .client
            .get(url)
            .query(&[
                ("sources", "0"),
                ("destinations", destination_idx.as_str()),
                ("annotations", "duration,distance"),
                ("access_token", self.config.access_token.as_str()),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<MapboxMatrixResponse>())
            .map_err(|err| ProviderError::from_http(NAME, err))?;

        parse_response(body, destinations.len())
    }
}

impl DistanceMatrixProvider for MapboxClient {
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

fn matrix_url(config: &MapboxConfig, origin: Coordinate, destinations: &[Coordinate]) -> String {
    let coords = std::iter::once(origin)
        .chain(destinations.iter().copied())
        .map(|c| format!("{:.6},{:.6}", c.lng, c.lat))
        .collect::<Vec<_>>()
        .join(";");

    format!(
        "{}/directions-matrix/v1/{}/{}",
        config.base_url.trim_end_matches('/'),
        config.profile,
        coords
    )
}

#[derive(Debug, Deserialize)]
struct MapboxMatrixResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    /// Seconds.
    durations: Option<Vec<Vec<Option<f64>>>>,
    /// Meters.
    distances: Option<Vec<Vec<Option<f64>>>>,
}

fn parse_response(
    body: MapboxMatrixResponse,
    expected: usize,
) -> Result<Vec<Option<Leg>>, ProviderError> {
    match body.code.as_str() {
        "Ok" => {}
        "NoRoute" => return Ok(vec![None; expected]),
        "InvalidInput" | "ProfileNotFound" => {
            return Err(ProviderError::unavailable(
                NAME,
                format!("{}: {}", body.code, body.message.unwrap_or_default()),
            ));
        }
        other => return Err(ProviderError::unavailable(NAME, other.to_string())),
    }

    let durations = body
        .durations
        .and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| ProviderError::unavailable(NAME, "response missing durations"))?;
    let distances = body
        .distances
        .and_then(|rows| rows.into_iter().next())
        .ok_or_else(|| ProviderError::unavailable(NAME, "response missing distances"))?;

    if durations.len() != expected || distances.len() != expected {
        return Err(ProviderError::unavailable(
            NAME,
            format!("expected {expected} columns, got {}", durations.len()),
        ));
    }

    Ok(durations
        .into_iter()
        .zip(distances)
        .map(|(secs, meters)| match (secs, meters) {
            (Some(secs), Some(meters)) => Some(Leg::new(secs / 60.0, meters / 1000.0)),
            _ => None,
        })
        .collect())
}
