//! Optional external collaborators
//!
//! Each capability is a trait with an "unavailable" default, selected at
//! startup from configuration presence. Failures inside a collaborator are
//! logged and degrade to `None`; they never reach the poll cycle.

pub mod analysis;
pub mod metrics;
pub mod speech;

pub use analysis::{AnalysisService, HttpAnalysisService, UnavailableAnalysis};
pub use metrics::{LogMetricsSink, MetricsSink, NoopMetricsSink};
pub use speech::{HttpSpeechService, SpeechService, UnavailableSpeech};

use std::time::Duration;

/// Shared client settings for collaborator calls
pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(crate::opensky::states::USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("⚠️  Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
        })
}
