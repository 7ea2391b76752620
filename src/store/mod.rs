//! Flight persistence backends
//!
//! One live record per `icao24`, latest state wins. Store failures never
//! abort a poll cycle; the poller logs and moves on to the next record.
//!
//! Backends:
//! - `SqliteFlightStore` - UPSERT into a `flights` table
//! - `MemoryFlightStore` - process-local map
//! - `PassThroughStore` - accepts writes, keeps nothing (no store configured)

pub mod sqlite;

use crate::error::PipelineError;
use crate::pipeline::types::{FlightRecord, FlightType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

pub use sqlite::SqliteFlightStore;

#[async_trait]
pub trait FlightStore: Send + Sync {
    /// Insert or replace the record for `record.icao24`
    async fn upsert(&self, record: &FlightRecord) -> Result<(), PipelineError>;

    async fn find_by_type(&self, flight_type: FlightType) -> Result<Vec<FlightRecord>, PipelineError>;

    async fn find_all(&self) -> Result<Vec<FlightRecord>, PipelineError>;

    async fn find_by_icao24(&self, icao24: &str) -> Result<Option<FlightRecord>, PipelineError>;

    /// False for the pass-through backend; readers fall back to the latest snapshot
    fn is_persistent(&self) -> bool {
        true
    }

    /// Backend type for logging
    fn backend_type(&self) -> &'static str;
}

#[derive(Debug, Default)]
pub struct MemoryFlightStore {
    flights: RwLock<HashMap<String, FlightRecord>>,
}

impl MemoryFlightStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.flights.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(_: impl std::fmt::Display) -> PipelineError {
    PipelineError::StoreRead("memory store lock poisoned".to_string())
}

fn sorted(mut records: Vec<FlightRecord>) -> Vec<FlightRecord> {
    records.sort_by(|a, b| a.icao24.cmp(&b.icao24));
    records
}

#[async_trait]
impl FlightStore for MemoryFlightStore {
    async fn upsert(&self, record: &FlightRecord) -> Result<(), PipelineError> {
        let mut flights = self.flights.write().map_err(|_| PipelineError::StoreWrite {
            icao24: record.icao24.clone(),
            reason: "memory store lock poisoned".to_string(),
        })?;
        flights.insert(record.icao24.clone(), record.clone());
        Ok(())
    }

    async fn find_by_type(&self, flight_type: FlightType) -> Result<Vec<FlightRecord>, PipelineError> {
        let flights = self.flights.read().map_err(poisoned)?;
        Ok(sorted(
            flights
                .values()
                .filter(|r| r.flight_type == flight_type)
                .cloned()
                .collect(),
        ))
    }

    async fn find_all(&self) -> Result<Vec<FlightRecord>, PipelineError> {
        let flights = self.flights.read().map_err(poisoned)?;
        Ok(sorted(flights.values().cloned().collect()))
    }

    async fn find_by_icao24(&self, icao24: &str) -> Result<Option<FlightRecord>, PipelineError> {
        let flights = self.flights.read().map_err(poisoned)?;
        Ok(flights.get(icao24).cloned())
    }

    fn backend_type(&self) -> &'static str {
        "Memory"
    }
}

/// Stand-in used when no store is configured or it could not be opened
#[derive(Debug, Default)]
pub struct PassThroughStore;

#[async_trait]
impl FlightStore for PassThroughStore {
    async fn upsert(&self, _record: &FlightRecord) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn find_by_type(&self, _flight_type: FlightType) -> Result<Vec<FlightRecord>, PipelineError> {
        Ok(Vec::new())
    }

    async fn find_all(&self) -> Result<Vec<FlightRecord>, PipelineError> {
        Ok(Vec::new())
    }

    async fn find_by_icao24(&self, _icao24: &str) -> Result<Option<FlightRecord>, PipelineError> {
        Ok(None)
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn backend_type(&self) -> &'static str {
        "PassThrough"
    }
}
