//! Flight analysis service
//!
//! POSTs the flight record as JSON to `ANALYSIS_URL` and expects
//! `{"text": "..."}` back.

use super::http_client;
use crate::pipeline::types::FlightRecord;
use async_trait::async_trait;
use serde::Deserialize;

const ANALYSIS_TIMEOUT_SECS: u64 = 30;

#[async_trait]
pub trait AnalysisService: Send + Sync {
    /// Narrative text for one flight, `None` when unavailable
    async fn analyze(&self, record: &FlightRecord) -> Option<String>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableAnalysis;

#[async_trait]
impl AnalysisService for UnavailableAnalysis {
    async fn analyze(&self, _record: &FlightRecord) -> Option<String> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    #[serde(default)]
    text: Option<String>,
}

pub struct HttpAnalysisService {
    client: reqwest::Client,
    url: String,
}

impl HttpAnalysisService {
    pub fn new(url: &str) -> Self {
        Self {
            client: http_client(ANALYSIS_TIMEOUT_SECS),
            url: url.to_string(),
        }
    }

    async fn request(&self, record: &FlightRecord) -> Result<Option<String>, reqwest::Error> {
        let response = self
            .client
            .post(&self.url)
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        let body: AnalysisResponse = response.json().await?;
        Ok(body.text.filter(|t| !t.trim().is_empty()))
    }
}

#[async_trait]
impl AnalysisService for HttpAnalysisService {
    async fn analyze(&self, record: &FlightRecord) -> Option<String> {
        match self.request(record).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("⚠️  Analysis unavailable for {}: {}", record.icao24, e);
                None
            }
        }
    }
}
