//! Best-effort metrics sink

/// Aggregate counters forwarded after each poll cycle
pub const METRIC_FLIGHTS_TOTAL: &str = "flights.total";
pub const METRIC_FLIGHTS_CARGO: &str = "flights.cargo";
pub const METRIC_FLIGHTS_COMMERCIAL: &str = "flights.commercial";
pub const METRIC_ALERTS_EMITTED: &str = "alerts.emitted";

/// Never fails and never blocks on I/O
pub trait MetricsSink: Send + Sync {
    fn send(&self, name: &str, value: f64);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn send(&self, _name: &str, _value: f64) {}
}

/// Writes each metric as a log line (`METRICS_ENABLED=true`)
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMetricsSink;

impl MetricsSink for LogMetricsSink {
    fn send(&self, name: &str, value: f64) {
        log::info!("📈 metric {}={}", name, value);
    }
}
