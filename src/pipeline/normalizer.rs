//! State-vector normalization into `FlightRecord`
//!
//! Upstream state vectors are positional JSON arrays. They are parsed into
//! `RawStateVector` right here and never travel further as arrays.
//!
//! Positions used:
//! - 0 icao24, 1 callsign, 2 origin country
//! - 5 longitude, 6 latitude, 7 barometric altitude
//! - 9 velocity, 10 true track (heading)

use super::classifier::Classifier;
use super::types::FlightRecord;
use crate::error::PipelineError;
use serde_json::Value;

const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_ALTITUDE: usize = 7;
const IDX_VELOCITY: usize = 9;
const IDX_HEADING: usize = 10;

/// Shortest tuple that still carries every field we read
pub const MIN_STATE_FIELDS: usize = IDX_HEADING + 1;

/// One upstream state vector with named fields
///
/// `fields` keeps the full original tuple (17 positions upstream) so callers
/// that round-trip it see the fields this crate does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStateVector {
    pub icao24: String,
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub altitude: Option<f64>,
    pub velocity: Option<f64>,
    pub heading: Option<f64>,
    pub fields: Vec<Value>,
}

impl RawStateVector {
    /// Parse a positional tuple, failing on short or wrongly typed input
    pub fn parse(values: &[Value]) -> Result<Self, PipelineError> {
        if values.len() < MIN_STATE_FIELDS {
            return Err(PipelineError::MalformedRecord(format!(
                "expected at least {} fields, got {}",
                MIN_STATE_FIELDS,
                values.len()
            )));
        }

        let icao24 = opt_string(values, IDX_ICAO24)?
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PipelineError::MalformedRecord("missing icao24".to_string()))?;

        Ok(Self {
            callsign: opt_string(values, IDX_CALLSIGN)?,
            origin_country: opt_string(values, IDX_ORIGIN_COUNTRY)?,
            longitude: opt_f64(values, IDX_LONGITUDE)?,
            latitude: opt_f64(values, IDX_LATITUDE)?,
            altitude: opt_f64(values, IDX_ALTITUDE)?,
            velocity: opt_f64(values, IDX_VELOCITY)?,
            heading: opt_f64(values, IDX_HEADING)?,
            icao24,
            fields: values.to_vec(),
        })
    }
}

fn opt_string(values: &[Value], idx: usize) -> Result<Option<String>, PipelineError> {
    match &values[idx] {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        other => Err(PipelineError::MalformedRecord(format!(
            "field {} should be a string, got {}",
            idx, other
        ))),
    }
}

fn opt_f64(values: &[Value], idx: usize) -> Result<Option<f64>, PipelineError> {
    match &values[idx] {
        Value::Null => Ok(None),
        Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| {
            PipelineError::MalformedRecord(format!("field {} is not representable as f64", idx))
        }),
        other => Err(PipelineError::MalformedRecord(format!(
            "field {} should be a number, got {}",
            idx, other
        ))),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    classifier: Classifier,
}

impl Normalizer {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Convert one parsed vector into a `FlightRecord`
    ///
    /// Returns `None` when latitude or longitude is missing.
    pub fn normalize(&self, raw: &RawStateVector, fetched_at: i64) -> Option<FlightRecord> {
        let (latitude, longitude) = match (raw.latitude, raw.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return None,
        };

        let trimmed = raw.callsign.as_deref().map(str::trim).unwrap_or("");
        let flight_type = self.classifier.classify(trimmed);
        let callsign = if trimmed.is_empty() {
            "N/A".to_string()
        } else {
            trimmed.to_string()
        };

        Some(FlightRecord {
            icao24: raw.icao24.clone(),
            callsign,
            origin_country: raw.origin_country.clone(),
            latitude,
            longitude,
            altitude: raw.altitude,
            velocity: raw.velocity,
            heading: raw.heading,
            flight_type,
            fetched_at,
        })
    }

    /// Parse and normalize a whole poll response
    ///
    /// Malformed vectors are logged and dropped one by one; positionless
    /// vectors are skipped silently.
    pub fn normalize_batch(&self, states: &[Vec<Value>], fetched_at: i64) -> Vec<FlightRecord> {
        let mut records = Vec::with_capacity(states.len());
        let mut malformed = 0usize;

        for values in states {
            match RawStateVector::parse(values) {
                Ok(raw) => {
                    if let Some(record) = self.normalize(&raw, fetched_at) {
                        records.push(record);
                    }
                }
                Err(e) => {
                    malformed += 1;
                    log::warn!("⚠️  Skipping state vector: {}", e);
                }
            }
        }

        if malformed > 0 {
            log::warn!(
                "⚠️  {} of {} state vectors were malformed (upstream schema drift?)",
                malformed,
                states.len()
            );
        }

        records
    }
}
