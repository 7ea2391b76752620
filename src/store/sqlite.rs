//! SQLite flight store
//!
//! Table `flights`, keyed on `icao24`:
//! - `upsert` - INSERT ... ON CONFLICT(icao24) DO UPDATE (stamps `last_seen`)
//! - reads ordered by `icao24`

use super::FlightStore;
use crate::error::PipelineError;
use crate::pipeline::types::{FlightRecord, FlightType};
use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SELECT_COLUMNS: &str = "icao24, callsign, origin_country, latitude, longitude, \
                              altitude, velocity, heading, type, fetched_at";

/// One connection behind a mutex, so writes for different `icao24` keys queue
/// behind each other. Acceptable because the poller is the only writer and
/// each upsert is a single short statement; readers from the HTTP surface
/// wait at most one statement.
pub struct SqliteFlightStore {
    conn: Mutex<Connection>,
}

impl SqliteFlightStore {
    /// Open (or create) the database and ensure the schema exists
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let db_path = db_path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::StoreRead(format!(
                    "failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(db_path).map_err(read_err)?;
        Self::init(conn)
    }

    /// In-memory database (tests, ephemeral runs)
    pub fn open_in_memory() -> Result<Self, PipelineError> {
        Self::init(Connection::open_in_memory().map_err(read_err)?)
    }

    fn init(conn: Connection) -> Result<Self, PipelineError> {
        // journal_mode answers with the resulting mode ("memory" for in-memory databases)
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(read_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(read_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS flights (
                icao24 TEXT PRIMARY KEY,
                callsign TEXT NOT NULL,
                origin_country TEXT,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                altitude REAL,
                velocity REAL,
                heading REAL,
                type TEXT NOT NULL,
                fetched_at INTEGER NOT NULL,
                last_seen INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_flights_type ON flights(type);",
        )
        .map_err(read_err)?;

        log::info!("✅ SQLite flight store initialized (journal_mode={})", mode);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PipelineError> {
        self.conn
            .lock()
            .map_err(|_| PipelineError::StoreRead("sqlite connection lock poisoned".to_string()))
    }

    fn query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<FlightRecord>, PipelineError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(read_err)?;
        let rows = stmt.query_map(args, row_to_record).map_err(read_err)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(read_err)
    }
}

fn read_err(err: rusqlite::Error) -> PipelineError {
    PipelineError::StoreRead(err.to_string())
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FlightRecord> {
    let flight_type: String = row.get(8)?;
    Ok(FlightRecord {
        icao24: row.get(0)?,
        callsign: row.get(1)?,
        origin_country: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        altitude: row.get(5)?,
        velocity: row.get(6)?,
        heading: row.get(7)?,
        flight_type: flight_type.parse().unwrap_or(FlightType::Unknown),
        fetched_at: row.get(9)?,
    })
}

#[async_trait]
impl FlightStore for SqliteFlightStore {
    async fn upsert(&self, record: &FlightRecord) -> Result<(), PipelineError> {
        let write_err = |e: rusqlite::Error| PipelineError::StoreWrite {
            icao24: record.icao24.clone(),
            reason: e.to_string(),
        };
        let now = chrono::Utc::now().timestamp();
        let conn = self.conn.lock().map_err(|_| PipelineError::StoreWrite {
            icao24: record.icao24.clone(),
            reason: "sqlite connection lock poisoned".to_string(),
        })?;

        conn.execute(
            r#"
            INSERT INTO flights (
                icao24, callsign, origin_country, latitude, longitude,
                altitude, velocity, heading, type, fetched_at, last_seen
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(icao24) DO UPDATE SET
                callsign = excluded.callsign,
                origin_country = excluded.origin_country,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                altitude = excluded.altitude,
                velocity = excluded.velocity,
                heading = excluded.heading,
                type = excluded.type,
                fetched_at = excluded.fetched_at,
                last_seen = excluded.last_seen
            "#,
            params![
                record.icao24,
                record.callsign,
                record.origin_country,
                record.latitude,
                record.longitude,
                record.altitude,
                record.velocity,
                record.heading,
                record.flight_type.as_str(),
                record.fetched_at,
                now,
            ],
        )
        .map_err(write_err)?;

        Ok(())
    }

    async fn find_by_type(&self, flight_type: FlightType) -> Result<Vec<FlightRecord>, PipelineError> {
        let sql = format!("SELECT {} FROM flights WHERE type = ?1 ORDER BY icao24", SELECT_COLUMNS);
        self.query(&sql, &[&flight_type.as_str()])
    }

    async fn find_all(&self) -> Result<Vec<FlightRecord>, PipelineError> {
        let sql = format!("SELECT {} FROM flights ORDER BY icao24", SELECT_COLUMNS);
        self.query(&sql, &[])
    }

    async fn find_by_icao24(&self, icao24: &str) -> Result<Option<FlightRecord>, PipelineError> {
        let sql = format!("SELECT {} FROM flights WHERE icao24 = ?1", SELECT_COLUMNS);
        Ok(self.query(&sql, &[&icao24])?.into_iter().next())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::record;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_upsert_same_key_keeps_one_row() {
        let dir = tempdir().unwrap();
        let store = SqliteFlightStore::open(dir.path().join("flights.db")).unwrap();

        store.upsert(&record("abc123", "FDX1", FlightType::Cargo, 1000.0)).await.unwrap();
        let mut second = record("abc123", "FDX1", FlightType::Cargo, 7500.0);
        second.heading = Some(270.0);
        second.fetched_at += 15;
        store.upsert(&second).await.unwrap();

        let all = store.find_all().await.unwrap();
        assert_eq!(all, vec![second]);
    }

    #[tokio::test]
    async fn test_find_by_type_filters() {
        let store = SqliteFlightStore::open_in_memory().unwrap();
        store.upsert(&record("ccc", "AAL1", FlightType::Commercial, 9000.0)).await.unwrap();
        store.upsert(&record("bbb", "UPS2", FlightType::Cargo, 9000.0)).await.unwrap();
        store.upsert(&record("aaa", "FDX3", FlightType::Cargo, 9000.0)).await.unwrap();

        let cargo = store.find_by_type(FlightType::Cargo).await.unwrap();
        let ids: Vec<&str> = cargo.iter().map(|r| r.icao24.as_str()).collect();
        assert_eq!(ids, vec!["aaa", "bbb"]);

        let commercial = store.find_by_type(FlightType::Commercial).await.unwrap();
        assert_eq!(commercial.len(), 1);
        assert!(store.find_by_type(FlightType::Unknown).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_icao24() {
        let store = SqliteFlightStore::open_in_memory().unwrap();
        let flight = record("abc123", "AMX5", FlightType::Commercial, 11000.0);
        store.upsert(&flight).await.unwrap();

        assert_eq!(store.find_by_icao24("abc123").await.unwrap(), Some(flight));
        assert_eq!(store.find_by_icao24("zzz999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_for_distinct_keys_all_land() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(SqliteFlightStore::open(dir.path().join("flights.db")).unwrap());

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let icao24 = format!("a{:05}", i);
                store.upsert(&record(&icao24, "AAL1", FlightType::Commercial, 9000.0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.find_all().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_reopen_preserves_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("flights.db");
        {
            let store = SqliteFlightStore::open(&path).unwrap();
            store.upsert(&record("abc123", "FDX1", FlightType::Cargo, 1000.0)).await.unwrap();
        }
        let reopened = SqliteFlightStore::open(&path).unwrap();
        assert_eq!(reopened.find_all().await.unwrap().len(), 1);
    }
}
