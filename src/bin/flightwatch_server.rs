//! Poller plus JSON API
//!
//! Usage:
//!   cargo run --release --bin flightwatch_server
//!
//! Binds `HTTP_BIND` (default 0.0.0.0:5000). Both the poller and the server
//! stop on CTRL+C / SIGTERM.

use flightwatch::api;
use flightwatch::config::Config;
use flightwatch::pipeline::{Poller, TrackerContext};
use flightwatch::shutdown;
use log::{error, info};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env()?;
    let bind = config.http_bind.clone();

    info!("🚀 Starting flightwatch server");
    info!("   ├─ HTTP: {}", bind);
    info!("   └─ Poll interval: {}s", config.poll_interval_secs);

    let ctx = Arc::new(TrackerContext::from_config(config)?);
    let shutdown_token = CancellationToken::new();
    shutdown::cancel_on_signal(shutdown_token.clone());

    let poller = Poller::new(ctx.clone());
    let poller_shutdown = shutdown_token.clone();
    let poller_handle = tokio::spawn(async move { poller.run(poller_shutdown).await });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("✅ Listening on {}", listener.local_addr()?);

    let server_shutdown = shutdown_token.clone();
    let served = axum::serve(listener, api::router(ctx))
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await;
    if let Err(e) = served {
        error!("❌ HTTP server failed: {}", e);
        shutdown_token.cancel();
    }

    if let Err(e) = poller_handle.await {
        error!("❌ Poller task failed: {}", e);
    }

    info!("✅ flightwatch server stopped");
    Ok(())
}
