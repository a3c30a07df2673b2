//! Error types for the relay daemon.
//!
//! Every variant here is fatal: the daemon refuses to start without a
//! valid configuration and a live broker subscription rather than
//! silently running with no data source.

use geotrace_relay::{IngestError, ServerError};

/// Errors that can abort daemon startup or operation.
#[derive(Debug, thiserror::Error)]
pub enum RelaydError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The broker connection or subscription failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The observer server failed to bind or serve.
    #[error(transparent)]
    Server(#[from] ServerError),
}
