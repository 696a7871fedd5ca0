//! Shareable Google Maps navigation links for a finished route.

use std::sync::LazyLock;

use reqwest::Url;

use crate::model::{Coordinate, Stop};

const DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";

static DIRECTIONS_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse(DIRECTIONS_URL).expect("directions base URL is a valid constant"));

/// Intermediate waypoints Google accepts in one directions link.
pub const MAX_LINK_WAYPOINTS: usize = 10;

/// One link per consecutive pair of depot → stop 1 → … → stop N → depot.
///
/// Always `N + 1` links; with no stops that is a single depot-to-depot link.
pub fn segment_links(depot: Coordinate, stops: &[Stop]) -> Vec<String> {
    route_path(depot, stops)
        .windows(2)
        .map(|pair| directions_link(pair[0], pair[1], &[]))
        .collect()
}

/// Whole-route links carrying at most `max_waypoints` intermediate stops each.
///
/// Consecutive links share their boundary point, so opening them in order
/// drives the full loop from depot back to depot.
pub fn overview_links(depot: Coordinate, stops: &[Stop], max_waypoints: usize) -> Vec<String> {
    let path = route_path(depot, stops);
    let step = max_waypoints + 1;
    let last = path.len() - 1;

    let mut links = Vec::new();
    let mut start = 0;
    while start < last {
        let end = (start + step).min(last);
        links.push(directions_link(path[start], path[end], &path[start + 1..end]));
        start = end;
    }
    links
}

fn route_path(depot: Coordinate, stops: &[Stop]) -> Vec<Coordinate> {
    std::iter::once(depot)
        .chain(stops.iter().map(Stop::coordinate))
        .chain(std::iter::once(depot))
        .collect()
}

fn directions_link(origin: Coordinate, destination: Coordinate, waypoints: &[Coordinate]) -> String {
    let origin = format_point(origin);
    let destination = format_point(destination);
    let waypoints = waypoints
        .iter()
        .map(|c| format_point(*c))
        .collect::<Vec<_>>()
        .join("|");

    let mut url = DIRECTIONS_BASE.clone();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("api", "1")
            .append_pair("origin", &origin)
            .append_pair("destination", &destination)
            .append_pair("travelmode", "driving");
        if !waypoints.is_empty() {
            query.append_pair("waypoints", &waypoints);
        }
    }
    url.into()
}

fn format_point(c: Coordinate) -> String {
    format!("{:.6},{:.6}", c.lat, c.lng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StopStatus;
    use crate::window::Franja;

    fn depot() -> Coordinate {
        Coordinate::new(-32.91973, -68.81829)
    }

    fn stop(orden: usize, lat: f64, lng: f64) -> Stop {
        Stop {
            orden,
            remito_id: orden as u64,
            remito_numero: format!("R-{orden}"),
            cliente: String::new(),
            direccion: String::new(),
            lat,
            lng,
            minutos_desde_anterior: 5.0,
            distancia_desde_anterior_km: 2.0,
            tiempo_espera_min: 10.0,
            minutos_acumulados: 15.0 * orden as f64,
            es_urgente: false,
            es_prioridad: false,
            ventana_tipo: Franja::SinHorario,
            estado: StopStatus::Pendiente,
        }
    }

    fn query_value(link: &str, key: &str) -> Option<String> {
        Url::parse(link)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_segment_links_count_is_stops_plus_one() {
        let stops = vec![stop(1, -32.90, -68.80), stop(2, -32.88, -68.84)];
        let links = segment_links(depot(), &stops);
        assert_eq!(links.len(), 3);

        assert_eq!(
            query_value(&links[0], "origin").as_deref(),
            Some("-32.919730,-68.818290")
        );
        assert_eq!(
            query_value(&links[0], "destination").as_deref(),
            Some("-32.900000,-68.800000")
        );
        assert_eq!(
            query_value(&links[2], "destination").as_deref(),
            Some("-32.919730,-68.818290"),
            "last segment returns to the depot"
        );
        assert_eq!(query_value(&links[1], "travelmode").as_deref(), Some("driving"));
    }

    #[test]
    fn test_empty_route_has_single_depot_link() {
        let links = segment_links(depot(), &[]);
        assert_eq!(links.len(), 1);
        assert_eq!(query_value(&links[0], "origin"), query_value(&links[0], "destination"));
    }

    #[test]
    fn test_overview_chunks_waypoints() {
        let stops: Vec<Stop> = (1..=23)
            .map(|i| stop(i, -32.9 + i as f64 * 0.001, -68.8))
            .collect();
        let links = overview_links(depot(), &stops, MAX_LINK_WAYPOINTS);

        // path has 25 points, 24 hops, 11 hops per link
        assert_eq!(links.len(), 3);
        for link in &links {
            let waypoints = query_value(link, "waypoints").unwrap_or_default();
            let count = if waypoints.is_empty() { 0 } else { waypoints.split('|').count() };
            assert!(count <= MAX_LINK_WAYPOINTS, "too many waypoints: {count}");
        }
        assert_eq!(
            query_value(&links[0], "destination"),
            query_value(&links[1], "origin"),
            "links chain end to start"
        );
        assert_eq!(
            query_value(&links[2], "destination").as_deref(),
            Some("-32.919730,-68.818290")
        );
    }

    #[test]
    fn test_links_are_percent_encoded() {
        let stops = vec![
            stop(1, -32.90, -68.80),
            stop(2, -32.88, -68.84),
            stop(3, -32.87, -68.83),
        ];
        let overview = overview_links(depot(), &stops, MAX_LINK_WAYPOINTS);
        let link = &overview[0];

        assert!(
            link.starts_with("https://www.google.com/maps/dir/?api=1&origin="),
            "unexpected link prefix: {link}"
        );
        assert!(link.contains("%2C"), "commas are encoded: {link}");
        assert!(link.contains("%7C"), "waypoint separator is encoded: {link}");
        assert!(!link.contains('|'), "raw separator leaked: {link}");
        assert_eq!(
            query_value(link, "waypoints").as_deref(),
            Some("-32.900000,-68.800000|-32.880000,-68.840000|-32.870000,-68.830000")
        );

        for segment in segment_links(depot(), &stops) {
            assert!(segment.starts_with("https://www.google.com/maps/dir/?api=1&"));
            assert!(!segment.contains("waypoints="), "segments carry no waypoints");
        }
    }

    #[test]
    fn test_overview_short_route_is_one_link() {
        let stops = vec![stop(1, -32.90, -68.80)];
        let links = overview_links(depot(), &stops, MAX_LINK_WAYPOINTS);
        assert_eq!(links.len(), 1);
        assert_eq!(
            query_value(&links[0], "waypoints").as_deref(),
            Some("-32.900000,-68.800000")
        );
    }
}
