//! Headless collector
//!
//! Polls OpenSky on a fixed interval, upserts the latest state per aircraft
//! and evaluates alerts. Stops on CTRL+C / SIGTERM.
//!
//! Usage:
//!   cargo run --release --bin collector
//!
//! Environment variables: see `Config::from_env` (`.env` is loaded first).

use flightwatch::config::Config;
use flightwatch::pipeline::{Poller, TrackerContext};
use flightwatch::shutdown;
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env()?;

    info!("🚀 Starting flightwatch collector");
    info!("   ├─ Interval: {}s", config.poll_interval_secs);
    info!(
        "   ├─ Bounding box: lat {}..{}, lon {}..{}",
        config.bbox.lat_min, config.bbox.lat_max, config.bbox.lon_min, config.bbox.lon_max
    );
    info!("   └─ Database: {}", config.db_path.as_deref().unwrap_or("(none)"));

    let ctx = Arc::new(TrackerContext::from_config(config)?);
    let shutdown_token = CancellationToken::new();
    shutdown::cancel_on_signal(shutdown_token.clone());

    info!("🔄 Press CTRL+C to shutdown gracefully");
    Poller::new(ctx).run(shutdown_token).await;

    info!("✅ Collector stopped");
    Ok(())
}
