//! Alert history and configuration routes

use super::error::{ApiError, InternalServerError};
use crate::pipeline::{Alert, AlertConfig, AlertConfigPatch, TrackerContext};
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertExport {
    pub exported_at: DateTime<Utc>,
    pub count: usize,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct ClearedDto {
    pub cleared: usize,
}

/// Alert history, oldest first
pub async fn list_alerts(State(ctx): State<Arc<TrackerContext>>) -> Json<Vec<Alert>> {
    let alerts = ctx.alerts.read().await.history().cloned().collect();
    Json(alerts)
}

/// Alert history as a downloadable JSON document
pub async fn export_alerts(State(ctx): State<Arc<TrackerContext>>) -> Response {
    let alerts: Vec<Alert> = ctx.alerts.read().await.history().cloned().collect();
    let export = AlertExport {
        exported_at: Utc::now(),
        count: alerts.len(),
        alerts,
    };

    let body = match serde_json::to_vec_pretty(&export) {
        Ok(body) => body,
        Err(e) => return InternalServerError(e).into_response(),
    };
    let filename = format!(
        "flightwatch-alerts-{}.json",
        export.exported_at.format("%Y%m%d-%H%M%S")
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(body),
    )
        .into_response()
}

/// Empties the history and forgets every cargo aircraft already announced
pub async fn clear_alerts(State(ctx): State<Arc<TrackerContext>>) -> Json<ClearedDto> {
    let mut engine = ctx.alerts.write().await;
    let cleared = engine.history_len();
    engine.clear();
    log::info!("🧹 Cleared {} alerts", cleared);
    Json(ClearedDto { cleared })
}

pub async fn get_alert_config(State(ctx): State<Arc<TrackerContext>>) -> Json<AlertConfig> {
    let config = *ctx.alerts.read().await.config();
    Json(config)
}

/// Merge a partial config in one step
///
/// # Responses
/// - 200 (OK): the merged config
/// - 400 (Bad Request): unreadable body or invalid threshold
pub async fn update_alert_config(
    State(ctx): State<Arc<TrackerContext>>,
    payload: Result<Json<AlertConfigPatch>, JsonRejection>,
) -> Result<Json<AlertConfig>, ApiError> {
    let Json(patch) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    patch.validate().map_err(ApiError::BadRequest)?;

    let updated = ctx.alerts.write().await.update_config(&patch);
    log::info!("⚙️  Alert config updated");
    Ok(Json(updated))
}

/// Spoken version of one alert
///
/// # Responses
/// - 200 (OK): audio bytes
/// - 404 (Not Found): no alert with that id in history
/// - 503 (Service Unavailable): speech service missing or failing
pub async fn alert_speech(
    State(ctx): State<Arc<TrackerContext>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: u64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid alert id '{}'", id)))?;

    let (text, severity) = {
        let engine = ctx.alerts.read().await;
        let alert = engine
            .find(id)
            .ok_or_else(|| ApiError::NotFound(format!("Alert {} not found", id)))?;
        (format!("{}. {}", alert.title, alert.message), alert.severity)
    };

    let audio = ctx
        .speech
        .synthesize(&text, severity)
        .await
        .ok_or(ApiError::Unavailable("Speech"))?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}
