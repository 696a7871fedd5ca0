//! HTTP failure mapping for the provider clients.
//!
//! Each test stands up a local TCP listener that either never answers or
//! answers with a fixed status line, and checks the error a client maps it to.

mod fixtures;

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::thread;

use fixtures::*;
use ruteo::google::{GoogleClient, GoogleConfig};
use ruteo::mapbox::{MapboxClient, MapboxConfig};
use ruteo::ors::{OrsClient, OrsConfig};
use ruteo::{
    CancelFlag, Coordinate, DistanceMatrixProvider, GenerationConfig, ProviderError,
    ProviderKind, ProviderSettings, RouteError, RouteService, Stage,
};

const SECRET: &str = "secret-key-7f3a";

// ============================================================================
// Test Infrastructure
// ============================================================================

/// Accepts connections and never writes a byte back.
fn silent_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind silent listener");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    (listener, base_url)
}

/// Answers every request with `status` and an empty body.
fn status_server(status: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind status listener");
    let addr: SocketAddr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = [0u8; 8192];
            let _ = stream.read(&mut buf);
            let response =
                format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{addr}")
}

fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn google(base_url: String) -> GoogleClient {
    GoogleClient::new(GoogleConfig {
        base_url,
        api_key: SECRET.to_string(),
        timeout_secs: 1,
        max_parallel: 1,
    })
    .unwrap()
}

fn mapbox(base_url: String) -> MapboxClient {
    MapboxClient::new(MapboxConfig {
        base_url,
        access_token: SECRET.to_string(),
        timeout_secs: 1,
        max_parallel: 1,
        ..MapboxConfig::default()
    })
    .unwrap()
}

fn ors(base_url: String) -> OrsClient {
    OrsClient::new(OrsConfig {
        base_url,
        api_key: SECRET.to_string(),
        timeout_secs: 1,
        max_parallel: 1,
        ..OrsConfig::default()
    })
    .unwrap()
}

fn depot() -> Coordinate {
    Coordinate::new(DEPOT.lat, DEPOT.lng)
}

fn city() -> Vec<Coordinate> {
    CITY.iter().map(|l| Coordinate::new(l.lat, l.lng)).collect()
}

fn assert_no_secret(err: &ProviderError) {
    assert!(!err.to_string().contains(SECRET), "credential leaked: {err}");
    assert!(!format!("{err:?}").contains(SECRET), "credential leaked: {err:?}");
}

// ============================================================================
// Rate limiting
// ============================================================================

#[test]
fn test_google_rate_limit_is_quota_without_key() {
    let client = google(status_server("429 Too Many Requests"));
    let err = client.legs_from(depot(), &city()).unwrap_err();

    assert!(
        matches!(err, ProviderError::ProviderQuotaExceeded { ref provider, .. } if provider == "google"),
        "unexpected error {err:?}"
    );
    assert_no_secret(&err);
}

#[test]
fn test_mapbox_rate_limit_is_quota_without_token() {
    let client = mapbox(status_server("429 Too Many Requests"));
    let err = client.legs_from(depot(), &city()).unwrap_err();

    assert!(
        matches!(err, ProviderError::ProviderQuotaExceeded { ref provider, .. } if provider == "mapbox"),
        "unexpected error {err:?}"
    );
    assert_no_secret(&err);
}

#[test]
fn test_ors_rate_limit_is_quota() {
    let client = ors(status_server("429 Too Many Requests"));
    let err = client.legs_from(depot(), &city()).unwrap_err();

    assert!(
        matches!(err, ProviderError::ProviderQuotaExceeded { ref provider, .. } if provider == "ors"),
        "unexpected error {err:?}"
    );
}

// ============================================================================
// Unavailable providers
// ============================================================================

#[test]
fn test_google_server_error_is_unavailable_without_key() {
    let client = google(status_server("500 Internal Server Error"));
    let err = client.legs_from(depot(), &city()).unwrap_err();

    assert!(
        matches!(err, ProviderError::ProviderUnavailable { .. }),
        "unexpected error {err:?}"
    );
    assert_no_secret(&err);
}

#[test]
fn test_ors_silent_server_times_out() {
    let (_listener, base_url) = silent_server();
    let client = ors(base_url);

    let err = client.legs_from(depot(), &city()).unwrap_err();

    match err {
        ProviderError::ProviderUnavailable { provider, detail } => {
            assert_eq!(provider, "ors");
            assert!(detail.starts_with("timeout"), "detail was {detail:?}");
        }
        other => panic!("expected ProviderUnavailable, got {other:?}"),
    }
}

#[test]
fn test_google_silent_server_times_out_without_key() {
    let (_listener, base_url) = silent_server();
    let err = google(base_url).legs_from(depot(), &city()).unwrap_err();

    assert!(
        matches!(err, ProviderError::ProviderUnavailable { ref detail, .. } if detail.starts_with("timeout")),
        "unexpected error {err:?}"
    );
    assert_no_secret(&err);
}

#[test]
fn test_refused_connection_is_unavailable() {
    let err = mapbox(closed_port_url())
        .legs_from(depot(), &city())
        .unwrap_err();

    assert!(
        matches!(err, ProviderError::ProviderUnavailable { ref provider, .. } if provider == "mapbox"),
        "unexpected error {err:?}"
    );
    assert_no_secret(&err);
}

// ============================================================================
// Whole runs
// ============================================================================

#[test]
fn test_silent_provider_fails_run_and_archives_nothing() {
    let (_listener, base_url) = silent_server();
    let client = ors(base_url);
    let service = RouteService::new(ProviderSettings::default());
    let config = GenerationConfig {
        proveedor_matrix: ProviderKind::Ors,
        ..GenerationConfig::default()
    };

    let err = service
        .generate_with(&config, &city_candidates(), &client, &CancelFlag::new())
        .unwrap_err();

    match err {
        RouteError::RouteGenerationFailed { stage, cause } => {
            assert_eq!(stage, Stage::Sequencer);
            assert!(
                matches!(cause, ProviderError::ProviderUnavailable { ref detail, .. } if detail.starts_with("timeout")),
                "unexpected cause {cause:?}"
            );
        }
        other => panic!("expected RouteGenerationFailed, got {other:?}"),
    }
    assert!(service.archive().is_empty(), "failed runs are never archived");
    assert!(service.accountant().is_empty(), "timed out calls are not billed");
    assert!(service.cache().is_empty(), "nothing fetched, nothing cached");
}
