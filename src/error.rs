//! Error types for providers and route generation.

use thiserror::Error;

/// Failure of a distance-matrix lookup.
///
/// Providers never retry; the caller decides whether to restart the whole run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("{provider} unavailable: {detail}")]
    ProviderUnavailable { provider: String, detail: String },

    #[error("{provider} quota exceeded: {detail}")]
    ProviderQuotaExceeded { provider: String, detail: String },

    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
}

impl ProviderError {
    pub fn unavailable(provider: &str, detail: impl Into<String>) -> Self {
        ProviderError::ProviderUnavailable {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    pub fn quota(provider: &str, detail: impl Into<String>) -> Self {
        ProviderError::ProviderQuotaExceeded {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// Maps a transport error the way every HTTP provider needs it mapped:
    /// timeouts and connection failures are `ProviderUnavailable`, HTTP 429 is
    /// a quota error.
    ///
    /// The request URL is dropped first; Google and Mapbox carry their
    /// credentials in the query string.
    pub fn from_http(provider: &str, err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            return ProviderError::quota(provider, err.to_string());
        }
        if err.is_timeout() {
            return ProviderError::unavailable(provider, format!("timeout: {err}"));
        }
        ProviderError::unavailable(provider, err.to_string())
    }
}

/// Pipeline stage where a generation failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ProviderSetup,
    Sequencer,
    ReturnLeg,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ProviderSetup => f.write_str("provider_setup"),
            Stage::Sequencer => f.write_str("sequencer"),
            Stage::ReturnLeg => f.write_str("return_leg"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    #[error("route generation failed at {stage}: {cause}")]
    RouteGenerationFailed {
        stage: Stage,
        #[source]
        cause: ProviderError,
    },

    #[error("candidate {0} excluded twice")]
    DuplicateExclusion(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("route generation cancelled")]
    Cancelled,

    #[error("route {0} not found")]
    RouteNotFound(u64),

    #[error("route {route_id} has no stop with order {order}")]
    StopNotFound { route_id: u64, order: usize },

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl RouteError {
    /// The provider failure behind a generation error, if any.
    pub fn provider_cause(&self) -> Option<&ProviderError> {
        match self {
            RouteError::RouteGenerationFailed { cause, .. } => Some(cause),
            _ => None,
        }
    }
}
