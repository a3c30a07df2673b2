//! Configuration for the relay daemon.
//!
//! All configuration is loaded from environment variables. The daemon
//! needs to know how to reach the broker, which subject carries
//! position payloads, where to listen for observers, and the bounds for
//! trails and outbound queues.

use crate::error::RelaydError;

/// Complete daemon configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct RelaydConfig {
    /// NATS server URL (e.g. `nats://localhost:4222`).
    pub nats_url: String,
    /// Subject carrying producer position payloads.
    pub ingest_subject: String,
    /// Host address the observer server binds to.
    pub listen_host: String,
    /// TCP port the observer server listens on.
    pub listen_port: u16,
    /// Bound on each entity's trail length.
    pub max_trail_length: usize,
    /// Capacity of each observer connection's outbound queue.
    pub send_queue_capacity: usize,
}

impl RelaydConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `NATS_URL` -- NATS server connection string
    ///
    /// Optional variables:
    /// - `INGEST_SUBJECT` -- position subject (default `geotrace.positions`)
    /// - `LISTEN_HOST` -- bind address (default `0.0.0.0`)
    /// - `LISTEN_PORT` -- listen port (default `8080`)
    /// - `MAX_TRAIL_LENGTH` -- per-entity trail bound (default `50`)
    /// - `SEND_QUEUE_CAPACITY` -- per-observer queue bound (default `256`)
    pub fn from_env() -> Result<Self, RelaydError> {
        let nats_url = env_var("NATS_URL")?;

        let ingest_subject = std::env::var("INGEST_SUBJECT")
            .unwrap_or_else(|_| "geotrace.positions".to_owned());

        let listen_host =
            std::env::var("LISTEN_HOST").unwrap_or_else(|_| "0.0.0.0".to_owned());

        let listen_port: u16 = std::env::var("LISTEN_PORT")
            .unwrap_or_else(|_| "8080".to_owned())
            .parse()
            .map_err(|e| RelaydError::Config(format!("invalid LISTEN_PORT: {e}")))?;

        let max_trail_length: usize = std::env::var("MAX_TRAIL_LENGTH")
            .unwrap_or_else(|_| "50".to_owned())
            .parse()
            .map_err(|e| RelaydError::Config(format!("invalid MAX_TRAIL_LENGTH: {e}")))?;

        let send_queue_capacity: usize = std::env::var("SEND_QUEUE_CAPACITY")
            .unwrap_or_else(|_| "256".to_owned())
            .parse()
            .map_err(|e| RelaydError::Config(format!("invalid SEND_QUEUE_CAPACITY: {e}")))?;

        Ok(Self {
            nats_url,
            ingest_subject,
            listen_host,
            listen_port,
            max_trail_length,
            send_queue_capacity,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, RelaydError> {
    std::env::var(name)
        .map_err(|e| RelaydError::Config(format!("missing required env var {name}: {e}")))
}
