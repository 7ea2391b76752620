//! Flight query routes

use super::error::ApiError;
use crate::opensky::RouteInfo;
use crate::pipeline::{run_cycle, FlightRecord, FlightType, TrackerContext};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct AnalysisDto {
    pub icao24: String,
    pub analysis: String,
}

/// Latest snapshot, no upstream call
///
/// # Responses
/// - 200 (OK): flights from the most recent successful cycle
pub async fn list_flights(State(ctx): State<Arc<TrackerContext>>) -> Json<Vec<FlightRecord>> {
    let flights = ctx.latest.read().await.clone();
    Json(flights)
}

/// Run one poll cycle now and return its batch
///
/// # Responses
/// - 200 (OK): normalized flights of the fresh cycle
/// - 429 (Too Many Requests): OpenSky rate limit
/// - 502 (Bad Gateway): token exchange or fetch failed
pub async fn live_flights(
    State(ctx): State<Arc<TrackerContext>>,
) -> Result<Json<Vec<FlightRecord>>, ApiError> {
    let report = run_cycle(&ctx).await?;
    Ok(Json(report.flights))
}

/// # Responses
/// - 200 (OK): flights of the requested type
/// - 400 (Bad Request): type is not cargo, commercial or unknown
pub async fn flights_by_type(
    State(ctx): State<Arc<TrackerContext>>,
    Path(flight_type): Path<String>,
) -> Result<Json<Vec<FlightRecord>>, ApiError> {
    let flight_type: FlightType = flight_type.parse().map_err(ApiError::BadRequest)?;
    Ok(Json(ctx.flights_by_type(flight_type).await?))
}

/// # Responses
/// - 200 (OK): most recent route of the aircraft
/// - 404 (Not Found): no flight in the last 24 hours
pub async fn flight_route(
    State(ctx): State<Arc<TrackerContext>>,
    Path(icao24): Path<String>,
) -> Result<Json<RouteInfo>, ApiError> {
    Ok(Json(ctx.route(&icao24).await?))
}

/// # Responses
/// - 200 (OK): analysis text
/// - 404 (Not Found): aircraft not tracked
/// - 503 (Service Unavailable): analysis service missing or failing
pub async fn flight_analysis(
    State(ctx): State<Arc<TrackerContext>>,
    Path(icao24): Path<String>,
) -> Result<Json<AnalysisDto>, ApiError> {
    let record = ctx
        .find_flight(&icao24)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Flight {} is not tracked", icao24)))?;

    let analysis = ctx
        .analysis
        .analyze(&record)
        .await
        .ok_or(ApiError::Unavailable("Analysis"))?;

    Ok(Json(AnalysisDto {
        icao24: record.icao24,
        analysis,
    }))
}
