//! flightwatch: OpenSky-fed aircraft tracker
//!
//! Polls state vectors for a bounding box, classifies each aircraft as cargo
//! or commercial, keeps the latest state per `icao24` and raises operator
//! alerts. `collector` runs the poller alone; `flightwatch_server` adds the
//! JSON API.

pub mod api;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod opensky;
pub mod pipeline;
pub mod shutdown;
pub mod store;

pub use config::Config;
pub use error::{ConfigError, PipelineError};
