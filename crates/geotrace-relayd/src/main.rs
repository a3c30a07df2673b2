//! Relay daemon binary for the Geotrace system.
//!
//! Wires together the broker ingestion loop and the observer fan-out
//! server. Loads configuration, connects and subscribes to the broker
//! (fatal on failure -- the relay must never run silently with no data
//! source), then serves observers until terminated.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from the environment
//! 3. Connect to NATS and subscribe to the position subject
//! 4. Create the shared relay state
//! 5. Spawn the ingestion loop
//! 6. Serve the observer HTTP/WebSocket endpoint

mod config;
mod error;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use geotrace_relay::{IngestClient, RelayState, ServerConfig, run_ingest, start_server};

use crate::config::RelaydConfig;
use crate::error::RelaydError;

/// Application entry point for the relay daemon.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the broker
/// subscription cannot be established, or the observer server fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("geotrace-relayd starting");

    // 2. Load configuration.
    let config = RelaydConfig::from_env()?;
    info!(
        nats_url = config.nats_url,
        ingest_subject = config.ingest_subject,
        listen_host = config.listen_host,
        listen_port = config.listen_port,
        max_trail_length = config.max_trail_length,
        "configuration loaded"
    );

    // 3. Connect and subscribe. Either failure is fatal.
    let ingest = IngestClient::connect(&config.nats_url)
        .await
        .map_err(RelaydError::from)?;
    let subscriber = ingest
        .subscribe(&config.ingest_subject)
        .await
        .map_err(RelaydError::from)?;

    // 4. Create the shared relay state.
    let state = RelayState::new(config.max_trail_length, config.send_queue_capacity);

    // 5. Spawn the ingestion loop.
    let ingest_state = Arc::clone(&state);
    tokio::spawn(async move {
        run_ingest(subscriber, ingest_state).await;
    });

    // 6. Serve observers until terminated.
    let server_config = ServerConfig {
        host: config.listen_host.clone(),
        port: config.listen_port,
    };
    start_server(&server_config, state)
        .await
        .map_err(RelaydError::from)?;

    Ok(())
}
