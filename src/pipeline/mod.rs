//! Flight tracking pipeline
//!
//! ```text
//! OpenSky states/all
//!     ↓
//! Normalizer (RawStateVector → FlightRecord, Classifier)
//!     ↓
//! FlightStore::upsert (one row per icao24)
//!     ↓
//! AlertEngine::evaluate (bounded history + seen-cargo set)
//!     ↓
//! MetricsSink (best effort)
//! ```
//!
//! `TrackerContext` carries the shared state; `Poller` drives cycles.

pub mod alerts;
pub mod classifier;
pub mod context;
pub mod normalizer;
pub mod poller;
pub mod types;

pub use alerts::{Alert, AlertConfig, AlertConfigPatch, AlertEngine, AlertType, Severity};
pub use classifier::{Classifier, OperatorPrefixTable};
pub use context::{TrackerContext, TrackerContextBuilder};
pub use normalizer::{Normalizer, RawStateVector};
pub use poller::{run_cycle, CycleReport, Poller};
pub use types::{FlightRecord, FlightType};
