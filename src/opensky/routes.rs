//! Most-recent-route lookup for one aircraft
//!
//! Endpoint: {api}/flights/aircraft?icao24=..&begin=..&end=..
//! Returns: array of flights for the last 24h, oldest first. Departure and
//! arrival codes are estimates and may be null.

use super::airports::{self, Coordinates};
use super::states::USER_AGENT;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const LOOKBACK_SECS: i64 = 24 * 3600;

#[derive(Debug, Clone, Deserialize)]
pub struct AircraftFlight {
    #[serde(default)]
    pub callsign: Option<String>,
    #[serde(rename = "estDepartureAirport", default)]
    pub est_departure_airport: Option<String>,
    #[serde(rename = "estArrivalAirport", default)]
    pub est_arrival_airport: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub icao24: String,
    pub callsign: String,
    pub origin: Option<Coordinates>,
    pub destination: Option<Coordinates>,
    #[serde(rename = "estDepartureAirport")]
    pub est_departure_airport: Option<String>,
    #[serde(rename = "estArrivalAirport")]
    pub est_arrival_airport: Option<String>,
}

pub struct RouteFetcher {
    client: reqwest::Client,
    api_url: String,
}

impl RouteFetcher {
    pub fn new(api_url: &str, timeout_secs: u64) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PipelineError::Upstream(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Look up the most recent flight of `icao24` within the last 24 hours
    ///
    /// # Returns
    /// * `Err(RouteNotFound)` - upstream has no flight (empty list or 404)
    pub async fn route(&self, token: &str, icao24: &str, now: i64) -> Result<RouteInfo, PipelineError> {
        let icao24 = icao24.trim().to_lowercase();
        let url = format!("{}/flights/aircraft", self.api_url);
        let begin = (now - LOOKBACK_SECS).to_string();
        let end = now.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("icao24", icao24.as_str()), ("begin", begin.as_str()), ("end", end.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PipelineError::RouteNotFound(icao24));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PipelineError::UpstreamRateLimited);
        }
        if !status.is_success() {
            return Err(PipelineError::Upstream(format!("OpenSky API error: {}", status)));
        }

        let flights: Vec<AircraftFlight> = response.json().await?;
        let latest = flights
            .last()
            .ok_or_else(|| PipelineError::RouteNotFound(icao24.clone()))?;

        log::debug!(
            "🛫 Route for {}: {:?} → {:?}",
            icao24,
            latest.est_departure_airport,
            latest.est_arrival_airport
        );

        Ok(resolve_route(&icao24, latest))
    }
}

/// Attach coordinates from the static airport table
pub fn resolve_route(icao24: &str, flight: &AircraftFlight) -> RouteInfo {
    let callsign = flight
        .callsign
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("N/A")
        .to_string();

    RouteInfo {
        icao24: icao24.to_string(),
        callsign,
        origin: flight.est_departure_airport.as_deref().and_then(airports::lookup),
        destination: flight.est_arrival_airport.as_deref().and_then(airports::lookup),
        est_departure_airport: flight.est_departure_airport.clone(),
        est_arrival_airport: flight.est_arrival_airport.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_route_uses_latest_flight() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/flights/aircraft")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("icao24".into(), "0d0abc".into()),
                Matcher::UrlEncoded("begin".into(), "1699913600".into()),
                Matcher::UrlEncoded("end".into(), "1700000000".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[
                    {"callsign":"AMX1  ","estDepartureAirport":"MMGL","estArrivalAirport":"MMMX"},
                    {"callsign":"AMX2  ","estDepartureAirport":"MMMX","estArrivalAirport":"KLAX"}
                ]"#,
            )
            .create_async()
            .await;

        let fetcher = RouteFetcher::new(&server.url(), 10).unwrap();
        let route = fetcher.route("tok", "0D0ABC", 1_700_000_000).await.unwrap();

        assert_eq!(route.callsign, "AMX2");
        assert_eq!(route.est_departure_airport.as_deref(), Some("MMMX"));
        assert_eq!(route.origin, airports::lookup("MMMX"));
        assert_eq!(route.destination, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_empty_history_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/flights/aircraft")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let fetcher = RouteFetcher::new(&server.url(), 10).unwrap();
        let err = fetcher.route("tok", "abc123", 1_700_000_000).await.unwrap_err();
        assert!(matches!(err, PipelineError::RouteNotFound(ref id) if id == "abc123"));
    }

    #[tokio::test]
    async fn test_upstream_404_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/flights/aircraft")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let fetcher = RouteFetcher::new(&server.url(), 10).unwrap();
        let err = fetcher.route("tok", "abc123", 1_700_000_000).await.unwrap_err();
        assert!(matches!(err, PipelineError::RouteNotFound(_)));
    }

    #[test]
    fn test_resolve_route_defaults_callsign() {
        let flight = AircraftFlight {
            callsign: None,
            est_departure_airport: None,
            est_arrival_airport: Some("MMUN".to_string()),
        };
        let route = resolve_route("abc123", &flight);
        assert_eq!(route.callsign, "N/A");
        assert_eq!(route.origin, None);
        assert_eq!(route.destination, airports::lookup("MMUN"));
    }
}
