//! Shared tracker state
//!
//! One `TrackerContext` is built at startup and handed (behind an `Arc`) to
//! both the poller and the HTTP surface. It owns the token cache, the alert
//! engine, the latest snapshot, the store and the optional collaborators.

use super::alerts::AlertEngine;
use super::classifier::Classifier;
use super::normalizer::Normalizer;
use super::types::{FlightRecord, FlightType};
use crate::collaborators::{
    AnalysisService, HttpAnalysisService, HttpSpeechService, LogMetricsSink, MetricsSink,
    NoopMetricsSink, SpeechService, UnavailableAnalysis, UnavailableSpeech,
};
use crate::config::Config;
use crate::error::PipelineError;
use crate::opensky::{RouteFetcher, RouteInfo, StateFetcher, TokenCache};
use crate::store::{FlightStore, PassThroughStore, SqliteFlightStore};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct TrackerContext {
    pub config: Config,
    pub tokens: TokenCache,
    pub states: StateFetcher,
    pub routes: RouteFetcher,
    pub normalizer: Normalizer,
    pub store: Arc<dyn FlightStore>,
    pub alerts: RwLock<AlertEngine>,
    /// Batch produced by the most recent successful cycle
    pub latest: RwLock<Vec<FlightRecord>>,
    /// Held for the whole duration of a poll cycle
    pub cycle_lock: Mutex<()>,
    pub metrics: Arc<dyn MetricsSink>,
    pub analysis: Arc<dyn AnalysisService>,
    pub speech: Arc<dyn SpeechService>,
}

/// Selects backends from configuration; every collaborator can be overridden
pub struct TrackerContextBuilder {
    config: Config,
    store: Option<Arc<dyn FlightStore>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    analysis: Option<Arc<dyn AnalysisService>>,
    speech: Option<Arc<dyn SpeechService>>,
    alerts: Option<AlertEngine>,
}

impl TrackerContextBuilder {
    pub fn store(mut self, store: Arc<dyn FlightStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn analysis(mut self, analysis: Arc<dyn AnalysisService>) -> Self {
        self.analysis = Some(analysis);
        self
    }

    pub fn speech(mut self, speech: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(speech);
        self
    }

    /// Replace the engine built from `config.alerts` (e.g. one with a fixed clock)
    pub fn alert_engine(mut self, engine: AlertEngine) -> Self {
        self.alerts = Some(engine);
        self
    }

    pub fn build(self) -> Result<TrackerContext, PipelineError> {
        let config = self.config;

        let tokens = TokenCache::new(&config.token_url, &config.client_id, &config.client_secret)?;
        let states = StateFetcher::new(&config.api_url, config.fetch_timeout_secs)?;
        let routes = RouteFetcher::new(&config.api_url, config.fetch_timeout_secs)?;
        let normalizer = Normalizer::new(Classifier::new(config.prefixes.clone()));

        let store = self.store.unwrap_or_else(|| open_store(&config));
        let metrics = self.metrics.unwrap_or_else(|| -> Arc<dyn MetricsSink> {
            if config.metrics_enabled {
                Arc::new(LogMetricsSink)
            } else {
                Arc::new(NoopMetricsSink)
            }
        });
        let analysis = self.analysis.unwrap_or_else(|| -> Arc<dyn AnalysisService> {
            match &config.analysis_url {
                Some(url) => Arc::new(HttpAnalysisService::new(url)),
                None => Arc::new(UnavailableAnalysis),
            }
        });
        let speech = self.speech.unwrap_or_else(|| -> Arc<dyn SpeechService> {
            match &config.tts_url {
                Some(url) => Arc::new(HttpSpeechService::new(url)),
                None => Arc::new(UnavailableSpeech),
            }
        });
        let alerts = self.alerts.unwrap_or_else(|| AlertEngine::new(config.alerts));

        log::info!("✅ Tracker context ready");
        log::info!("   ├─ Store: {}", store.backend_type());
        log::info!("   ├─ Analysis: {}", availability(config.analysis_url.is_some()));
        log::info!("   ├─ Speech: {}", availability(config.tts_url.is_some()));
        log::info!("   └─ Metrics: {}", if config.metrics_enabled { "log" } else { "disabled" });

        Ok(TrackerContext {
            config,
            tokens,
            states,
            routes,
            normalizer,
            store,
            alerts: RwLock::new(alerts),
            latest: RwLock::new(Vec::new()),
            cycle_lock: Mutex::new(()),
            metrics,
            analysis,
            speech,
        })
    }
}

fn availability(configured: bool) -> &'static str {
    if configured {
        "http"
    } else {
        "unavailable"
    }
}

/// SQLite when `FLIGHTWATCH_DB_PATH` is set and opens, pass-through otherwise
fn open_store(config: &Config) -> Arc<dyn FlightStore> {
    match &config.db_path {
        Some(path) => match SqliteFlightStore::open(path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                log::warn!("⚠️  Could not open flight store at {}: {}", path, e);
                log::warn!("   └─ Continuing without persistence");
                Arc::new(PassThroughStore)
            }
        },
        None => Arc::new(PassThroughStore),
    }
}

impl TrackerContext {
    pub fn builder(config: Config) -> TrackerContextBuilder {
        TrackerContextBuilder {
            config,
            store: None,
            metrics: None,
            analysis: None,
            speech: None,
            alerts: None,
        }
    }

    pub fn from_config(config: Config) -> Result<Self, PipelineError> {
        Self::builder(config).build()
    }

    /// Flights of one type; served from the snapshot when nothing is persisted
    pub async fn flights_by_type(&self, flight_type: FlightType) -> Result<Vec<FlightRecord>, PipelineError> {
        if self.store.is_persistent() {
            return self.store.find_by_type(flight_type).await;
        }
        Ok(self
            .latest
            .read()
            .await
            .iter()
            .filter(|r| r.flight_type == flight_type)
            .cloned()
            .collect())
    }

    /// Latest snapshot first, then the store
    pub async fn find_flight(&self, icao24: &str) -> Result<Option<FlightRecord>, PipelineError> {
        let icao24 = icao24.trim().to_lowercase();
        if let Some(record) = self.latest.read().await.iter().find(|r| r.icao24 == icao24) {
            return Ok(Some(record.clone()));
        }
        self.store.find_by_icao24(&icao24).await
    }

    pub async fn route(&self, icao24: &str) -> Result<RouteInfo, PipelineError> {
        let token = self.tokens.get_token().await?;
        let now = chrono::Utc::now().timestamp();
        self.routes.route(&token, icao24, now).await
    }
}
