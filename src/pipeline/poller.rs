//! Poll cycle and timer-driven loop
//!
//! One cycle: token → fetch → normalize → upsert → evaluate → metrics.
//! Only token and fetch failures abort a cycle; store and metrics failures
//! are logged per record and the batch carries on. The loop itself never
//! exits on a cycle error, only on cancellation.

use super::alerts::Alert;
use super::context::TrackerContext;
use super::types::{FlightRecord, FlightType};
use crate::collaborators::metrics::{
    METRIC_ALERTS_EMITTED, METRIC_FLIGHTS_CARGO, METRIC_FLIGHTS_COMMERCIAL, METRIC_FLIGHTS_TOTAL,
};
use crate::error::PipelineError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Outcome of one completed cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub flights: Vec<FlightRecord>,
    pub alerts: Vec<Alert>,
    /// Raw state vectors received before normalization
    pub received: usize,
    pub store_failures: usize,
}

impl CycleReport {
    pub fn count_of(&self, flight_type: FlightType) -> usize {
        self.flights.iter().filter(|r| r.flight_type == flight_type).count()
    }
}

/// Run one cycle to completion
///
/// Cycles are serialized through `ctx.cycle_lock`; a caller arriving while
/// another cycle is in flight waits for it to finish.
pub async fn run_cycle(ctx: &TrackerContext) -> Result<CycleReport, PipelineError> {
    let _guard = ctx.cycle_lock.lock().await;

    let token = ctx.tokens.get_token().await?;
    let raw = match ctx.states.fetch(&token, &ctx.config.bbox).await {
        Ok(raw) => raw,
        Err(e @ PipelineError::Auth(_)) => {
            ctx.tokens.invalidate().await;
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    let fetched_at = chrono::Utc::now().timestamp();
    let flights = ctx.normalizer.normalize_batch(&raw, fetched_at);

    let mut store_failures = 0;
    for record in &flights {
        if let Err(e) = ctx.store.upsert(record).await {
            store_failures += 1;
            log::warn!("⚠️  {}", e);
        }
    }

    let alerts = ctx.alerts.write().await.evaluate(&flights);
    *ctx.latest.write().await = flights.clone();

    let report = CycleReport {
        flights,
        alerts,
        received: raw.len(),
        store_failures,
    };
    publish_metrics(ctx, &report);

    log::info!("✈️  Cycle complete: {} flights", report.flights.len());
    log::info!("   ├─ Cargo: {}", report.count_of(FlightType::Cargo));
    log::info!("   ├─ Commercial: {}", report.count_of(FlightType::Commercial));
    if report.store_failures > 0 {
        log::info!("   ├─ Store failures: {}", report.store_failures);
    }
    log::info!("   └─ Alerts: {}", report.alerts.len());

    Ok(report)
}

fn publish_metrics(ctx: &TrackerContext, report: &CycleReport) {
    let metrics = &ctx.metrics;
    metrics.send(METRIC_FLIGHTS_TOTAL, report.flights.len() as f64);
    metrics.send(METRIC_FLIGHTS_CARGO, report.count_of(FlightType::Cargo) as f64);
    metrics.send(METRIC_FLIGHTS_COMMERCIAL, report.count_of(FlightType::Commercial) as f64);
    metrics.send(METRIC_ALERTS_EMITTED, report.alerts.len() as f64);
}

/// Timer-driven driver around [`run_cycle`]
pub struct Poller {
    ctx: Arc<TrackerContext>,
    interval: Duration,
}

impl Poller {
    pub fn new(ctx: Arc<TrackerContext>) -> Self {
        let interval = Duration::from_secs(ctx.config.poll_interval_secs);
        Self { ctx, interval }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Loop until `shutdown` is cancelled
    ///
    /// Cancellation is observed during the sleep between cycles; an in-flight
    /// cycle is bounded by the HTTP client timeouts.
    pub async fn run(&self, shutdown: CancellationToken) {
        log::info!("⏰ Starting poller (interval: {}s)", self.interval.as_secs());

        let mut cycles: u64 = 0;
        loop {
            if shutdown.is_cancelled() {
                break;
            }

            cycles += 1;
            match run_cycle(&self.ctx).await {
                Ok(_) => {}
                Err(PipelineError::UpstreamRateLimited) => {
                    log::warn!("⚠️  Cycle {} skipped: upstream rate limit, retrying next interval", cycles);
                }
                Err(e) => {
                    log::error!("❌ Cycle {} failed: {}", cycles, e);
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        log::info!("🛑 Poller stopped after {} cycles", cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MetricsSink;
    use crate::pipeline::alerts::AlertType;
    use crate::pipeline::context::test_support::config_for;
    use crate::store::{FlightStore, MemoryFlightStore};
    use mockito::Matcher;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingMetrics {
        sent: Mutex<Vec<(String, f64)>>,
    }

    impl MetricsSink for RecordingMetrics {
        fn send(&self, name: &str, value: f64) {
            self.sent.lock().unwrap().push((name.to_string(), value));
        }
    }

    const STATES_BODY: &str = r#"{"time":1700000000,"states":[
        ["0d0001","FDX12   ","United States",1,1,-99.1,19.4,2000.0,false,200.0,90.0],
        ["0d0002","AAL20   ","United States",1,1,-100.0,25.0,11000.0,false,240.0,180.0],
        ["0d0003","AMX400  ","Mexico",1,1,null,null,9000.0,false,230.0,10.0]
    ]}"#;

    async fn mock_token(server: &mut mockito::ServerGuard) -> mockito::Mock {
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"tok","expires_in":1800}"#)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_cycle_stores_evaluates_and_reports() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _states = server
            .mock("GET", "/states/all")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(STATES_BODY)
            .create_async()
            .await;

        let store = Arc::new(MemoryFlightStore::new());
        let metrics = Arc::new(RecordingMetrics::default());
        let ctx = TrackerContext::builder(config_for(&server.url()))
            .store(store.clone())
            .metrics(metrics.clone())
            .build()
            .unwrap();

        let report = run_cycle(&ctx).await.unwrap();

        assert_eq!(report.received, 3);
        assert_eq!(report.flights.len(), 2);
        assert_eq!(report.store_failures, 0);
        assert_eq!(store.len(), 2);
        assert_eq!(ctx.latest.read().await.len(), 2);

        // FDX12 enters as cargo and flies below 3000 m
        let types: Vec<AlertType> = report.alerts.iter().map(|a| a.alert_type).collect();
        assert_eq!(types, vec![AlertType::CargoEntry, AlertType::LowAltitude]);

        let sent = metrics.sent.lock().unwrap().clone();
        assert!(sent.contains(&(METRIC_FLIGHTS_TOTAL.to_string(), 2.0)));
        assert!(sent.contains(&(METRIC_FLIGHTS_CARGO.to_string(), 1.0)));
        assert!(sent.contains(&(METRIC_ALERTS_EMITTED.to_string(), 2.0)));
    }

    #[tokio::test]
    async fn test_rate_limited_cycle_leaves_state_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _states = server
            .mock("GET", "/states/all")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let store = Arc::new(MemoryFlightStore::new());
        let ctx = TrackerContext::builder(config_for(&server.url()))
            .store(store.clone())
            .build()
            .unwrap();

        let err = run_cycle(&ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::UpstreamRateLimited));
        assert!(store.is_empty());
        assert_eq!(ctx.alerts.read().await.history_len(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_cycle() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(401)
            .with_body(r#"{"error":"invalid_client"}"#)
            .create_async()
            .await;
        let states = server
            .mock("GET", "/states/all")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let ctx = TrackerContext::from_config(config_for(&server.url())).unwrap();
        let err = run_cycle(&ctx).await.unwrap_err();

        assert!(matches!(err, PipelineError::Auth(_)));
        states.assert_async().await;
    }

    #[tokio::test]
    async fn test_store_failure_does_not_abort_batch() {
        struct FailingStore;

        #[async_trait::async_trait]
        impl FlightStore for FailingStore {
            async fn upsert(&self, record: &FlightRecord) -> Result<(), PipelineError> {
                Err(PipelineError::StoreWrite {
                    icao24: record.icao24.clone(),
                    reason: "disk full".to_string(),
                })
            }
            async fn find_by_type(&self, _t: FlightType) -> Result<Vec<FlightRecord>, PipelineError> {
                Ok(Vec::new())
            }
            async fn find_all(&self) -> Result<Vec<FlightRecord>, PipelineError> {
                Ok(Vec::new())
            }
            async fn find_by_icao24(&self, _id: &str) -> Result<Option<FlightRecord>, PipelineError> {
                Ok(None)
            }
            fn backend_type(&self) -> &'static str {
                "Failing"
            }
        }

        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _states = server
            .mock("GET", "/states/all")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(STATES_BODY)
            .create_async()
            .await;

        let ctx = TrackerContext::builder(config_for(&server.url()))
            .store(Arc::new(FailingStore))
            .build()
            .unwrap();

        let report = run_cycle(&ctx).await.unwrap();
        assert_eq!(report.store_failures, 2);
        assert_eq!(report.flights.len(), 2);
        assert!(!report.alerts.is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancellation() {
        let mut server = mockito::Server::new_async().await;
        let _token = mock_token(&mut server).await;
        let _states = server
            .mock("GET", "/states/all")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let ctx = Arc::new(TrackerContext::from_config(config_for(&server.url())).unwrap());
        let poller = Poller::new(ctx).with_interval(Duration::from_secs(3600));
        let shutdown = CancellationToken::new();

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { poller.run(shutdown).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("poller did not stop within the shutdown bound")
            .unwrap();
    }
}
