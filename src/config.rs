//! Runtime configuration from environment variables
//!
//! Every value has a documented default except the upstream credentials.

use crate::error::ConfigError;
use crate::pipeline::alerts::{AlertConfig, RuleConfig};
use crate::pipeline::classifier::OperatorPrefixTable;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

pub const DEFAULT_TOKEN_URL: &str =
    "https://auth.opensky-network.org/auth/realms/opensky-network/protocol/openid-connect/token";
pub const DEFAULT_API_URL: &str = "https://opensky-network.org/api";

/// Lat/lon rectangle sent upstream as `lamin,lomin,lamax,lomax`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lat_min: f64,
    pub lon_min: f64,
    pub lat_max: f64,
    pub lon_max: f64,
}

impl BoundingBox {
    /// Approximate box around Mexico
    pub fn mexico() -> Self {
        Self {
            lat_min: 14.0,
            lon_min: -118.0,
            lat_max: 33.0,
            lon_max: -86.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lat_min >= self.lat_max || self.lon_min >= self.lon_max {
            return Err(ConfigError::InvalidValue(format!(
                "bounding box min must be below max (lat {}..{}, lon {}..{})",
                self.lat_min, self.lat_max, self.lon_min, self.lon_max
            )));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 || self.lon_min < -180.0 || self.lon_max > 180.0 {
            return Err(ConfigError::InvalidValue(
                "bounding box outside valid lat/lon range".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_params(&self) -> [(&'static str, f64); 4] {
        [
            ("lamin", self.lat_min),
            ("lomin", self.lon_min),
            ("lamax", self.lat_max),
            ("lomax", self.lon_max),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_url: String,
    pub bbox: BoundingBox,
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    /// SQLite file; `None` runs with the pass-through store
    pub db_path: Option<String>,
    pub prefixes: OperatorPrefixTable,
    pub alerts: AlertConfig,
    pub analysis_url: Option<String>,
    pub tts_url: Option<String>,
    pub metrics_enabled: bool,
    pub http_bind: String,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `OPENSKY_CLIENT_ID` / `OPENSKY_CLIENT_SECRET` (required)
    /// - `OPENSKY_TOKEN_URL`, `OPENSKY_API_URL`
    /// - `BBOX_LAT_MIN`, `BBOX_LON_MIN`, `BBOX_LAT_MAX`, `BBOX_LON_MAX` (default: Mexico)
    /// - `COLLECT_INTERVAL` seconds (default: 15)
    /// - `FETCH_TIMEOUT_SECS` (default: 15)
    /// - `FLIGHTWATCH_DB_PATH` (default: unset, no persistence)
    /// - `CARGO_PREFIXES`, `COMMERCIAL_PREFIXES` (comma-separated)
    /// - `ALERT_{CARGO_ENTRY,HIGH_COUNT,LOW_ALTITUDE,ABNORMAL_SPEED}_{ENABLED,THRESHOLD}`
    /// - `ANALYSIS_URL`, `TTS_URL`, `METRICS_ENABLED`
    /// - `HTTP_BIND` (default: 0.0.0.0:5000)
    ///
    /// `RUST_LOG` is read by the logger builder in each binary, not here.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] but reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client_id = required(&lookup, "OPENSKY_CLIENT_ID")?;
        let client_secret = required(&lookup, "OPENSKY_CLIENT_SECRET")?;

        let token_url = lookup("OPENSKY_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string());
        let api_url = lookup("OPENSKY_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        for (name, url) in [("OPENSKY_TOKEN_URL", &token_url), ("OPENSKY_API_URL", &api_url)] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::InvalidValue(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        let default_bbox = BoundingBox::mexico();
        let bbox = BoundingBox {
            lat_min: parse_or(&lookup, "BBOX_LAT_MIN", default_bbox.lat_min),
            lon_min: parse_or(&lookup, "BBOX_LON_MIN", default_bbox.lon_min),
            lat_max: parse_or(&lookup, "BBOX_LAT_MAX", default_bbox.lat_max),
            lon_max: parse_or(&lookup, "BBOX_LON_MAX", default_bbox.lon_max),
        };
        bbox.validate()?;

        let poll_interval_secs: u64 = parse_or(&lookup, "COLLECT_INTERVAL", 15);
        if poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "COLLECT_INTERVAL must be at least 1 second".to_string(),
            ));
        }

        let prefixes = OperatorPrefixTable::new(
            split_list(lookup("CARGO_PREFIXES")),
            split_list(lookup("COMMERCIAL_PREFIXES")),
        );

        let defaults = AlertConfig::default();
        let alerts = AlertConfig {
            cargo_entry: rule(&lookup, "CARGO_ENTRY", defaults.cargo_entry),
            high_count: rule(&lookup, "HIGH_COUNT", defaults.high_count),
            low_altitude: rule(&lookup, "LOW_ALTITUDE", defaults.low_altitude),
            abnormal_speed: rule(&lookup, "ABNORMAL_SPEED", defaults.abnormal_speed),
        };

        Ok(Self {
            client_id,
            client_secret,
            token_url,
            api_url,
            bbox,
            poll_interval_secs,
            fetch_timeout_secs: parse_or(&lookup, "FETCH_TIMEOUT_SECS", 15),
            db_path: non_empty(lookup("FLIGHTWATCH_DB_PATH")),
            prefixes,
            alerts,
            analysis_url: non_empty(lookup("ANALYSIS_URL")),
            tts_url: non_empty(lookup("TTS_URL")),
            metrics_enabled: parse_or(&lookup, "METRICS_ENABLED", false),
            http_bind: lookup("HTTP_BIND").unwrap_or_else(|| "0.0.0.0:5000".to_string()),
        })
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(key)).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Debug,
{
    match lookup(key) {
        Some(raw) => match raw.trim().to_lowercase().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Invalid {} '{}', defaulting to {:?}", key, raw, default);
                default
            }
        },
        None => default,
    }
}

fn rule<F>(lookup: &F, name: &str, default: RuleConfig) -> RuleConfig
where
    F: Fn(&str) -> Option<String>,
{
    RuleConfig {
        enabled: parse_or(lookup, &format!("ALERT_{}_ENABLED", name), default.enabled),
        threshold: parse_or(lookup, &format!("ALERT_{}_THRESHOLD", name), default.threshold),
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
