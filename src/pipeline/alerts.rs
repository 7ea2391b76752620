//! Stateful alert engine
//!
//! Evaluates each poll batch against four independently toggleable rules:
//!
//! - **cargo_entry**: first sighting of a cargo aircraft (one-shot per icao24)
//! - **high_count**: batch size above threshold
//! - **low_altitude**: altitude below threshold
//! - **abnormal_speed**: velocity above threshold
//!
//! Dedup is count-based: `high_count` looks at the last 5 history entries,
//! `low_altitude` / `abnormal_speed` at the last 10 for the same aircraft.
//! History and the seen-cargo set are cleared together.

use super::types::{FlightRecord, FlightType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

pub const HISTORY_CAPACITY: usize = 100;
pub const HIGH_COUNT_DEDUP_WINDOW: usize = 5;
pub const PER_AIRCRAFT_DEDUP_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    CargoEntry,
    HighCount,
    LowAltitude,
    AbnormalSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Danger => "danger",
        }
    }
}

/// Partial flight record attached to an alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightSnapshot {
    pub icao24: String,
    pub callsign: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    #[serde(rename = "type")]
    pub flight_type: FlightType,
}

impl From<&FlightRecord> for FlightSnapshot {
    fn from(record: &FlightRecord) -> Self {
        Self {
            icao24: record.icao24.clone(),
            callsign: record.callsign.clone(),
            latitude: record.latitude,
            longitude: record.longitude,
            altitude: record.altitude,
            velocity: record.velocity,
            flight_type: record.flight_type,
        }
    }
}

/// Immutable once created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: u64,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "flightData", skip_serializing_if = "Option::is_none", default)]
    pub flight_data: Option<FlightSnapshot>,
}

impl Alert {
    fn icao24(&self) -> Option<&str> {
        self.flight_data.as_ref().map(|f| f.icao24.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub enabled: bool,
    pub threshold: f64,
}

impl RuleConfig {
    pub fn new(enabled: bool, threshold: f64) -> Self {
        Self { enabled, threshold }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    pub cargo_entry: RuleConfig,
    pub high_count: RuleConfig,
    /// Meters
    pub low_altitude: RuleConfig,
    /// Meters per second
    pub abnormal_speed: RuleConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cargo_entry: RuleConfig::new(true, 0.0),
            high_count: RuleConfig::new(true, 50.0),
            low_altitude: RuleConfig::new(true, 3000.0),
            abnormal_speed: RuleConfig::new(true, 500.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    pub enabled: Option<bool>,
    pub threshold: Option<f64>,
}

impl RulePatch {
    fn apply_to(&self, rule: &mut RuleConfig) {
        if let Some(enabled) = self.enabled {
            rule.enabled = enabled;
        }
        if let Some(threshold) = self.threshold {
            rule.threshold = threshold;
        }
    }
}

/// Partial config update; a full `AlertConfig` document also deserializes into it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertConfigPatch {
    pub cargo_entry: Option<RulePatch>,
    pub high_count: Option<RulePatch>,
    pub low_altitude: Option<RulePatch>,
    pub abnormal_speed: Option<RulePatch>,
}

impl AlertConfigPatch {
    /// Reject thresholds that cannot be compared meaningfully
    pub fn validate(&self) -> Result<(), String> {
        let rules = [
            ("cargo_entry", self.cargo_entry),
            ("high_count", self.high_count),
            ("low_altitude", self.low_altitude),
            ("abnormal_speed", self.abnormal_speed),
        ];
        for (name, patch) in rules {
            if let Some(threshold) = patch.and_then(|p| p.threshold) {
                if !threshold.is_finite() || threshold < 0.0 {
                    return Err(format!("{} threshold must be a non-negative number", name));
                }
            }
        }
        Ok(())
    }

    /// Produce the merged config without touching `base`
    pub fn merged(&self, base: &AlertConfig) -> AlertConfig {
        let mut merged = *base;
        let pairs = [
            (self.cargo_entry, &mut merged.cargo_entry),
            (self.high_count, &mut merged.high_count),
            (self.low_altitude, &mut merged.low_altitude),
            (self.abnormal_speed, &mut merged.abnormal_speed),
        ];
        for (patch, rule) in pairs {
            if let Some(patch) = patch {
                patch.apply_to(rule);
            }
        }
        merged
    }
}

/// Alert ids: `max(previous + 1, now in ms)`
///
/// Still time-derived, but two alerts in the same millisecond never share an id.
#[derive(Debug, Default)]
pub struct AlertIdGenerator {
    last: AtomicU64,
}

impl AlertIdGenerator {
    pub fn next(&self, now_ms: u64) -> u64 {
        let mut current = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now_ms.max(current + 1);
            match self
                .last
                .compare_exchange_weak(current, candidate, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return candidate,
                Err(observed) => current = observed,
            }
        }
    }
}

pub struct AlertEngine {
    config: AlertConfig,
    history: VecDeque<Alert>,
    seen_cargo: HashSet<String>,
    ids: AlertIdGenerator,
    capacity: usize,
    /// Timestamp function (for testing with mock time)
    now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl AlertEngine {
    pub fn new(config: AlertConfig) -> Self {
        Self::new_with_clock(config, Box::new(Utc::now))
    }

    pub fn new_with_clock(config: AlertConfig, now_fn: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>) -> Self {
        Self {
            config,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            seen_cargo: HashSet::new(),
            ids: AlertIdGenerator::default(),
            capacity: HISTORY_CAPACITY,
            now_fn,
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Merge `patch` into the live config in one step
    pub fn update_config(&mut self, patch: &AlertConfigPatch) -> AlertConfig {
        self.config = patch.merged(&self.config);
        self.config
    }

    /// Oldest first
    pub fn history(&self) -> impl Iterator<Item = &Alert> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn find(&self, id: u64) -> Option<&Alert> {
        self.history.iter().find(|a| a.id == id)
    }

    pub fn has_seen_cargo(&self, icao24: &str) -> bool {
        self.seen_cargo.contains(icao24)
    }

    /// Empty history and the seen-cargo set together
    pub fn clear(&mut self) {
        self.history.clear();
        self.seen_cargo.clear();
    }

    /// Evaluate one batch and return the alerts it produced
    ///
    /// New alerts are appended to history after all rules ran, then history
    /// is trimmed to the most recent `HISTORY_CAPACITY` entries.
    pub fn evaluate(&mut self, batch: &[FlightRecord]) -> Vec<Alert> {
        let now = (self.now_fn)();
        let mut alerts = Vec::new();

        if self.config.cargo_entry.enabled {
            for record in batch.iter().filter(|r| r.is_cargo()) {
                if self.seen_cargo.insert(record.icao24.clone()) {
                    alerts.push(self.build(
                        now,
                        AlertType::CargoEntry,
                        Severity::Warning,
                        "New cargo aircraft".to_string(),
                        format!(
                            "Cargo flight {} ({}) entered the monitored area",
                            record.callsign, record.icao24
                        ),
                        Some(record),
                    ));
                }
            }
        }

        let high_count = self.config.high_count;
        if high_count.enabled && batch.len() as f64 > high_count.threshold && !self.recent_high_count() {
            alerts.push(self.build(
                now,
                AlertType::HighCount,
                Severity::Info,
                "High air traffic".to_string(),
                format!(
                    "{} aircraft in the monitored area (threshold {})",
                    batch.len(),
                    high_count.threshold
                ),
                None,
            ));
        }

        let low_altitude = self.config.low_altitude;
        if low_altitude.enabled {
            for record in batch {
                let Some(altitude) = record.altitude else { continue };
                if altitude < low_altitude.threshold
                    && !self.recent_for_aircraft(AlertType::LowAltitude, &record.icao24)
                {
                    alerts.push(self.build(
                        now,
                        AlertType::LowAltitude,
                        Severity::Danger,
                        "Low altitude".to_string(),
                        format!(
                            "Flight {} at {:.0} m (threshold {} m)",
                            record.callsign, altitude, low_altitude.threshold
                        ),
                        Some(record),
                    ));
                }
            }
        }

        let abnormal_speed = self.config.abnormal_speed;
        if abnormal_speed.enabled {
            for record in batch {
                let Some(velocity) = record.velocity else { continue };
                if velocity > abnormal_speed.threshold
                    && !self.recent_for_aircraft(AlertType::AbnormalSpeed, &record.icao24)
                {
                    alerts.push(self.build(
                        now,
                        AlertType::AbnormalSpeed,
                        Severity::Warning,
                        "Abnormal speed".to_string(),
                        format!(
                            "Flight {} at {:.0} m/s (threshold {} m/s)",
                            record.callsign, velocity, abnormal_speed.threshold
                        ),
                        Some(record),
                    ));
                }
            }
        }

        self.history.extend(alerts.iter().cloned());
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        alerts
    }

    fn build(
        &self,
        now: DateTime<Utc>,
        alert_type: AlertType,
        severity: Severity,
        title: String,
        message: String,
        record: Option<&FlightRecord>,
    ) -> Alert {
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        Alert {
            id: self.ids.next(now_ms),
            alert_type,
            title,
            message,
            severity,
            timestamp: now,
            flight_data: record.map(FlightSnapshot::from),
        }
    }

    fn recent(&self, window: usize) -> impl Iterator<Item = &Alert> {
        self.history.iter().rev().take(window)
    }

    fn recent_high_count(&self) -> bool {
        self.recent(HIGH_COUNT_DEDUP_WINDOW)
            .any(|a| a.alert_type == AlertType::HighCount)
    }

    fn recent_for_aircraft(&self, alert_type: AlertType, icao24: &str) -> bool {
        self.recent(PER_AIRCRAFT_DEDUP_WINDOW)
            .any(|a| a.alert_type == alert_type && a.icao24() == Some(icao24))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_engine(config: AlertConfig) -> AlertEngine {
        AlertEngine::new_with_clock(
            config,
            Box::new(|| Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        )
    }

    fn flight(icao24: &str, callsign: &str, flight_type: FlightType) -> FlightRecord {
        FlightRecord {
            icao24: icao24.to_string(),
            callsign: callsign.to_string(),
            origin_country: Some("Mexico".to_string()),
            latitude: 19.4,
            longitude: -99.1,
            altitude: Some(10_000.0),
            velocity: Some(230.0),
            heading: Some(180.0),
            flight_type,
            fetched_at: 1_700_000_000,
        }
    }

    fn only(rule: AlertType, threshold: f64) -> AlertConfig {
        let off = RuleConfig::new(false, 0.0);
        let on = RuleConfig::new(true, threshold);
        AlertConfig {
            cargo_entry: if rule == AlertType::CargoEntry { on } else { off },
            high_count: if rule == AlertType::HighCount { on } else { off },
            low_altitude: if rule == AlertType::LowAltitude { on } else { off },
            abnormal_speed: if rule == AlertType::AbnormalSpeed { on } else { off },
        }
    }

    fn count(alerts: &[Alert], alert_type: AlertType) -> usize {
        alerts.iter().filter(|a| a.alert_type == alert_type).count()
    }

    #[test]
    fn test_cargo_entry_is_one_shot() {
        let mut engine = fixed_engine(only(AlertType::CargoEntry, 0.0));
        let batch = vec![flight("aaa111", "FDX1", FlightType::Cargo)];

        let first = engine.evaluate(&batch);
        let second = engine.evaluate(&batch);

        assert_eq!(count(&first, AlertType::CargoEntry), 1);
        assert_eq!(first[0].severity, Severity::Warning);
        assert!(second.is_empty());
        assert!(engine.has_seen_cargo("aaa111"));
    }

    #[test]
    fn test_clear_resets_cargo_entry() {
        let mut engine = fixed_engine(only(AlertType::CargoEntry, 0.0));
        let batch = vec![flight("aaa111", "FDX1", FlightType::Cargo)];

        engine.evaluate(&batch);
        engine.clear();
        assert_eq!(engine.history_len(), 0);
        assert!(!engine.has_seen_cargo("aaa111"));

        let after_clear = engine.evaluate(&batch);
        assert_eq!(count(&after_clear, AlertType::CargoEntry), 1);
    }

    #[test]
    fn test_commercial_never_triggers_cargo_entry() {
        let mut engine = fixed_engine(only(AlertType::CargoEntry, 0.0));
        let alerts = engine.evaluate(&[flight("bbb222", "AAL20", FlightType::Commercial)]);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_high_count_suppressed_within_window() {
        let mut engine = fixed_engine(only(AlertType::HighCount, 10.0));
        let batch: Vec<FlightRecord> = (0..11)
            .map(|i| flight(&format!("id{:04}", i), "AMX1", FlightType::Commercial))
            .collect();

        let first = engine.evaluate(&batch);
        assert_eq!(count(&first, AlertType::HighCount), 1);
        assert_eq!(first[0].severity, Severity::Info);
        assert!(first[0].flight_data.is_none());

        let second = engine.evaluate(&batch);
        assert_eq!(count(&second, AlertType::HighCount), 0);
    }

    #[test]
    fn test_high_count_at_threshold_does_not_fire() {
        let mut engine = fixed_engine(only(AlertType::HighCount, 10.0));
        let batch: Vec<FlightRecord> = (0..10)
            .map(|i| flight(&format!("id{:04}", i), "AMX1", FlightType::Commercial))
            .collect();
        assert!(engine.evaluate(&batch).is_empty());
    }

    #[test]
    fn test_high_count_fires_again_once_pushed_out_of_window() {
        let mut config = only(AlertType::HighCount, 10.0);
        config.low_altitude = RuleConfig::new(true, 20_000.0);
        let mut engine = fixed_engine(config);

        let busy: Vec<FlightRecord> = (0..11)
            .map(|i| flight(&format!("id{:04}", i), "AMX1", FlightType::Commercial))
            .collect();
        let first = engine.evaluate(&busy);
        assert_eq!(count(&first, AlertType::HighCount), 1);
        assert_eq!(count(&first, AlertType::LowAltitude), 11);

        // The 11 low-altitude alerts now sit after the high_count entry
        let second = engine.evaluate(&busy);
        assert_eq!(count(&second, AlertType::HighCount), 1);
    }

    #[test]
    fn test_low_altitude_dedup_per_aircraft() {
        let mut engine = fixed_engine(only(AlertType::LowAltitude, 1000.0));
        let mut low = flight("ccc333", "AMX3", FlightType::Commercial);
        low.altitude = Some(500.0);
        let mut other = flight("ddd444", "AMX4", FlightType::Commercial);
        other.altitude = Some(800.0);

        let first = engine.evaluate(&[low.clone()]);
        assert_eq!(count(&first, AlertType::LowAltitude), 1);
        assert_eq!(first[0].severity, Severity::Danger);

        let second = engine.evaluate(&[low.clone(), other]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].flight_data.as_ref().unwrap().icao24, "ddd444");
    }

    #[test]
    fn test_low_altitude_ignores_missing_altitude() {
        let mut engine = fixed_engine(only(AlertType::LowAltitude, 1000.0));
        let mut grounded = flight("eee555", "AMX5", FlightType::Commercial);
        grounded.altitude = None;
        assert!(engine.evaluate(&[grounded]).is_empty());
    }

    #[test]
    fn test_low_altitude_refires_after_window_passes() {
        let mut engine = fixed_engine(only(AlertType::LowAltitude, 1000.0));
        let mut target = flight("target", "AMX9", FlightType::Commercial);
        target.altitude = Some(100.0);
        engine.evaluate(&[target.clone()]);

        let fillers: Vec<FlightRecord> = (0..10)
            .map(|i| {
                let mut f = flight(&format!("fill{:02}", i), "AMX1", FlightType::Commercial);
                f.altitude = Some(200.0);
                f
            })
            .collect();
        engine.evaluate(&fillers);

        let again = engine.evaluate(&[target]);
        assert_eq!(count(&again, AlertType::LowAltitude), 1);
    }

    #[test]
    fn test_abnormal_speed_rule() {
        let mut engine = fixed_engine(only(AlertType::AbnormalSpeed, 300.0));
        let mut fast = flight("fff666", "AMX6", FlightType::Commercial);
        fast.velocity = Some(320.0);
        let slow = flight("ggg777", "AMX7", FlightType::Commercial);

        let alerts = engine.evaluate(&[fast.clone(), slow]);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::AbnormalSpeed);
        assert_eq!(alerts[0].severity, Severity::Warning);

        assert!(engine.evaluate(&[fast]).is_empty());
    }

    #[test]
    fn test_disabled_rules_emit_nothing() {
        let off = RuleConfig::new(false, 0.0);
        let mut engine = fixed_engine(AlertConfig {
            cargo_entry: off,
            high_count: off,
            low_altitude: RuleConfig::new(false, 1e9),
            abnormal_speed: off,
        });
        let batch = vec![flight("aaa111", "FDX1", FlightType::Cargo)];
        assert!(engine.evaluate(&batch).is_empty());
        assert!(!engine.has_seen_cargo("aaa111"));
    }

    #[test]
    fn test_history_bounded_to_most_recent() {
        let mut engine = fixed_engine(only(AlertType::CargoEntry, 0.0));
        let mut produced = Vec::new();
        for i in 0..150 {
            let batch = vec![flight(&format!("c{:05}", i), "FDX1", FlightType::Cargo)];
            produced.extend(engine.evaluate(&batch));
        }

        assert_eq!(produced.len(), 150);
        assert_eq!(engine.history_len(), HISTORY_CAPACITY);
        let kept: Vec<u64> = engine.history().map(|a| a.id).collect();
        let expected: Vec<u64> = produced[50..].iter().map(|a| a.id).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let mut engine = fixed_engine(only(AlertType::CargoEntry, 0.0));
        let batch: Vec<FlightRecord> = (0..20)
            .map(|i| flight(&format!("c{:05}", i), "FDX1", FlightType::Cargo))
            .collect();

        let alerts = engine.evaluate(&batch);
        let ids: HashSet<u64> = alerts.iter().map(|a| a.id).collect();
        assert_eq!(ids.len(), 20);
        let first = alerts[0].id;
        assert!(alerts.windows(2).all(|w| w[1].id > w[0].id));
        assert!(first >= 1_700_000_000_000);
    }

    #[test]
    fn test_config_patch_merges_fields() {
        let mut engine = fixed_engine(AlertConfig::default());
        let patch = AlertConfigPatch {
            abnormal_speed: Some(RulePatch {
                enabled: Some(false),
                threshold: None,
            }),
            high_count: Some(RulePatch {
                enabled: None,
                threshold: Some(5.0),
            }),
            ..Default::default()
        };

        let updated = engine.update_config(&patch);
        assert!(!updated.abnormal_speed.enabled);
        assert_eq!(updated.abnormal_speed.threshold, 500.0);
        assert!(updated.high_count.enabled);
        assert_eq!(updated.high_count.threshold, 5.0);
        assert_eq!(updated.low_altitude, AlertConfig::default().low_altitude);
    }

    #[test]
    fn test_full_config_deserializes_as_patch() {
        let json = serde_json::to_string(&AlertConfig::default()).unwrap();
        let patch: AlertConfigPatch = serde_json::from_str(&json).unwrap();
        assert_eq!(patch.merged(&AlertConfig::default()), AlertConfig::default());
    }

    #[test]
    fn test_patch_rejects_negative_threshold() {
        let patch = AlertConfigPatch {
            low_altitude: Some(RulePatch {
                enabled: None,
                threshold: Some(-1.0),
            }),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_alert_json_shape() {
        let mut engine = fixed_engine(only(AlertType::CargoEntry, 0.0));
        let alerts = engine.evaluate(&[flight("aaa111", "FDX1", FlightType::Cargo)]);
        let json = serde_json::to_value(&alerts[0]).unwrap();

        assert_eq!(json["type"], "cargo_entry");
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["flightData"]["icao24"], "aaa111");
        assert_eq!(json["flightData"]["type"], "cargo");
    }
}
