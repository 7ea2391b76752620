//! OAuth2 client-credentials token cache
//!
//! The cached token is handed out while `now < expires_at`. Refresh happens
//! lazily on the first call after expiry, with the cache lock held across the
//! exchange so a burst of callers produces exactly one request.

use crate::error::PipelineError;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

pub const DEFAULT_EXPIRES_IN_SECS: i64 = 1800;
const TOKEN_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub value: String,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
}

pub struct TokenCache {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    cached: Mutex<Option<AccessToken>>,
    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl TokenCache {
    pub fn new(token_url: &str, client_id: &str, client_secret: &str) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(TOKEN_TIMEOUT_SECS))
            .build()
            .map_err(|e| PipelineError::Auth(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            token_url: token_url.to_string(),
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
            cached: Mutex::new(None),
            now_fn: Box::new(|| chrono::Utc::now().timestamp()),
        })
    }

    /// Replace the clock (tests drive expiry explicitly)
    pub fn with_clock(mut self, now_fn: Box<dyn Fn() -> i64 + Send + Sync>) -> Self {
        self.now_fn = now_fn;
        self
    }

    /// Return a valid bearer token, refreshing it if needed
    pub async fn get_token(&self) -> Result<String, PipelineError> {
        let mut cached = self.cached.lock().await;

        let now = (self.now_fn)();
        if let Some(token) = cached.as_ref() {
            if token.is_valid_at(now) {
                return Ok(token.value.clone());
            }
            log::debug!("🔑 Access token expired, refreshing");
        }

        let token = self.exchange(now).await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// Drop the cached token so the next call performs a fresh exchange
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn exchange(&self, now: i64) -> Result<AccessToken, PipelineError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PipelineError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("❌ OAuth2 token exchange failed: {} - {}", status, body);
            return Err(PipelineError::Auth(format!("token endpoint returned {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Auth(format!("malformed token response: {}", e)))?;

        let value = body
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PipelineError::Auth("token response without access_token".to_string()))?;
        let expires_in = body.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        log::info!("🔑 Obtained OpenSky access token (expires in {}s)", expires_in);

        Ok(AccessToken {
            value,
            expires_at: now.saturating_add(expires_in),
        })
    }
}
