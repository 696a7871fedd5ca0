//! Google Distance Matrix adapter.

use serde::Deserialize;

use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::matrix::{Leg, bounded_pool, fan_out, validate_all};
use crate::model::Coordinate;
use crate::traits::DistanceMatrixProvider;

const NAME: &str = "google";

/// Destinations per request.
const MAX_DESTINATIONS: usize = 25;

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub max_parallel: usize,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://maps.googleapis.com".to_string(),
            api_key: String::new(),
            timeout_secs: 30,
            max_parallel: 4,
        }
    }
}

impl GoogleConfig {
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = settings.google_api_key.clone().ok_or_else(|| {
            ProviderError::unavailable(NAME, "GOOGLE_MAPS_API_KEY not configured")
        })?;
        Ok(Self {
            base_url: settings.google_base_url.clone(),
            api_key,
            timeout_secs: settings.timeout_secs,
            max_parallel: settings.max_parallel,
        })
    }
}

pub struct GoogleClient {
    config: GoogleConfig,
    client: reqwest::blocking::Client,
    pool: rayon::ThreadPool,
}

impl GoogleClient {
    pub fn new(config: GoogleConfig) -> Result<Self, ProviderError> {
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
        let url = format!(
            "{}/maps/api/distancematrix/json",
            self.config.base_url.trim_end_matches('/')
        );
        let origins = format_point(origin);
        let destinations_param = destinations
            .iter()
            .map(|c| format_point(*c))
            .collect::<Vec<_>>()
            .join("|");

        tracing::debug!(destinations = destinations.len(), "requesting google distance matrix");

        let body = self
            .client
            .get(url)
            .query(&[
                ("origins", origins.as_str()),
                ("destinations", destinations_param.as_str()),
                ("mode", "driving"),
                ("units", "metric"),
                ("key", self.config.api_key.as_str()),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<DistanceMatrixResponse>())
            .map_err(|err| ProviderError::from_http(NAME, err))?;

        parse_response(body, destinations.len())
    }
}

impl DistanceMatrixProvider for GoogleClient {
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

fn format_point(c: Coordinate) -> String {
    format!("{:.6},{:.6}", c.lat, c.lng)
}

#[derive(Debug, Deserialize)]
struct DistanceMatrixResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<Row>,
}

#[derive(Debug, Deserialize)]
struct Row {
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    status: String,
    duration: Option<Value>,
    distance: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Value {
    value: f64,
}

fn parse_response(
    body: DistanceMatrixResponse,
    expected: usize,
) -> Result<Vec<Option<Leg>>, ProviderError> {
    let detail = || {
        format!(
            "{}: {}",
            body.status,
            body.error_message.clone().unwrap_or_default()
        )
    };
    match body.status.as_str() {
        "OK" => {}
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => return Err(ProviderError::quota(NAME, detail())),
        _ => return Err(ProviderError::unavailable(NAME, detail())),
    }

    let elements = body
        .rows
        .into_iter()
        .next()
        .map(|row| row.elements)
        .ok_or_else(|| ProviderError::unavailable(NAME, "response has no rows"))?;

    if elements.len() != expected {
        return Err(ProviderError::unavailable(
            NAME,
            format!("expected {expected} elements, got {}", elements.len()),
        ));
    }

    Ok(elements
        .into_iter()
        .map(|element| match (element.status.as_str(), element.duration, element.distance) {
            ("OK", Some(duration), Some(distance)) => {
                Some(Leg::new(duration.value / 60.0, distance.value / 1000.0))
            }
            _ => None,
        })
        .collect())
}
