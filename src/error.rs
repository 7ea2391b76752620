//! Error taxonomy for the ingestion pipeline
//!
//! Only `Auth`, `UpstreamRateLimited` and `Upstream` abort a poll cycle.
//! Store and per-record failures are logged at the call site and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Token exchange returned a non-success status or an unusable body.
    #[error("OAuth2 token exchange failed: {0}")]
    Auth(String),

    /// Upstream answered HTTP 429; callers should retry on a later cycle.
    #[error("Upstream rate limit reached, retry later")]
    UpstreamRateLimited,

    /// Network fault, timeout, or non-success HTTP status other than 429.
    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Failed to store flight {icao24}: {reason}")]
    StoreWrite { icao24: String, reason: String },

    #[error("Failed to read flights from store: {0}")]
    StoreRead(String),

    /// A state vector did not match the expected positional schema.
    #[error("Malformed state vector: {0}")]
    MalformedRecord(String),

    #[error("No recent flight found for aircraft {0}")]
    RouteNotFound(String),
}

impl PipelineError {
    /// True when the failure only affects the current cycle and the next
    /// interval should simply try again.
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::Auth(_) | PipelineError::UpstreamRateLimited | PipelineError::Upstream(_)
        )
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.status() == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
            return PipelineError::UpstreamRateLimited;
        }
        if err.is_timeout() {
            return PipelineError::Upstream(format!("request timed out: {}", err));
        }
        PipelineError::Upstream(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
