//! OpenSky `states/all` client
//!
//! Endpoint: {api}/states/all?lamin=..&lomin=..&lamax=..&lomax=..
//! Returns: `{"time": 1700000000, "states": [[...17 positional fields...]]}`
//! (`states` is `null` when the box is empty)

use crate::config::BoundingBox;
use crate::error::PipelineError;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const USER_AGENT: &str = concat!("flightwatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatesResponse {
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub states: Option<Vec<Vec<Value>>>,
}

impl StatesResponse {
    pub fn into_states(self) -> Vec<Vec<Value>> {
        self.states.unwrap_or_default()
    }
}

pub struct StateFetcher {
    client: reqwest::Client,
    api_url: String,
}

impl StateFetcher {
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

    /// Fetch raw state vectors inside `bbox`
    ///
    /// # Returns
    /// * `Err(UpstreamRateLimited)` - HTTP 429
    /// * `Err(Auth)` - HTTP 401, the bearer token was rejected
    /// * `Err(Upstream)` - any other HTTP failure, timeout or undecodable body
    pub async fn fetch(&self, token: &str, bbox: &BoundingBox) -> Result<Vec<Vec<Value>>, PipelineError> {
        let url = format!("{}/states/all", self.api_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&bbox.query_params())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            log::warn!("⚠️  OpenSky rate limit reached (HTTP 429)");
            return Err(PipelineError::UpstreamRateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PipelineError::Auth("bearer token rejected by OpenSky API".to_string()));
        }
        if !status.is_success() {
            return Err(PipelineError::Upstream(format!("OpenSky API error: {}", status)));
        }

        let body: StatesResponse = response.json().await?;
        let states = body.into_states();
        log::debug!("📡 Received {} state vectors", states.len());
        Ok(states)
    }
}
