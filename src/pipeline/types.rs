//! Core flight data structures
//!
//! `FlightRecord` is the canonical per-aircraft state produced by the
//! normalizer. Identity is `icao24`; every sighting supersedes the last.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Heuristic operator classification derived from the callsign prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightType {
    Cargo,
    Commercial,
    Unknown,
}

impl FlightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightType::Cargo => "cargo",
            FlightType::Commercial => "commercial",
            FlightType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FlightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cargo" => Ok(FlightType::Cargo),
            "commercial" => Ok(FlightType::Commercial),
            "unknown" => Ok(FlightType::Unknown),
            other => Err(format!("unknown flight type '{}'", other)),
        }
    }
}

/// Latest known state of one aircraft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub icao24: String,
    /// Trimmed callsign, `"N/A"` when the upstream value was blank
    pub callsign: String,
    pub origin_country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    /// Barometric altitude in meters
    pub altitude: Option<f64>,
    /// Ground speed in m/s
    pub velocity: Option<f64>,
    /// True track in decimal degrees clockwise from north
    pub heading: Option<f64>,
    #[serde(rename = "type")]
    pub flight_type: FlightType,
    /// Unix timestamp (seconds) of the poll that produced this record
    pub fetched_at: i64,
}

impl FlightRecord {
    pub fn is_cargo(&self) -> bool {
        self.flight_type == FlightType::Cargo
    }
}
