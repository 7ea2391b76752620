//! JSON query surface over the shared `TrackerContext`
//!
//! Read-only routes take read locks; the only writers are the alert
//! config merge, alert clearing and the on-demand `live` cycle.

pub mod alerts;
pub mod error;
pub mod flights;

pub use error::{ApiError, ErrorDto};

use crate::pipeline::TrackerContext;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub store: &'static str,
    pub flights: usize,
    pub alerts: usize,
}

pub fn router(ctx: Arc<TrackerContext>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/flights", get(flights::list_flights))
        .route("/api/flights/live", get(flights::live_flights))
        .route("/api/flights/type/{flight_type}", get(flights::flights_by_type))
        .route("/api/flights/{icao24}/route", get(flights::flight_route))
        .route("/api/flights/{icao24}/analysis", get(flights::flight_analysis))
        .route(
            "/api/alerts",
            get(alerts::list_alerts).delete(alerts::clear_alerts),
        )
        .route("/api/alerts/export", get(alerts::export_alerts))
        .route(
            "/api/alerts/config",
            get(alerts::get_alert_config).put(alerts::update_alert_config),
        )
        .route("/api/alerts/{id}/speech", post(alerts::alert_speech))
        .with_state(ctx)
}

async fn health(State(ctx): State<Arc<TrackerContext>>) -> Json<HealthDto> {
    let flights = ctx.latest.read().await.len();
    let alerts = ctx.alerts.read().await.history_len();
    Json(HealthDto {
        status: "ok",
        store: ctx.store.backend_type(),
        flights,
        alerts,
    })
}
