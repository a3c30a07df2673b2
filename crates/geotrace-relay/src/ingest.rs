//! Broker ingestion adapter.
//!
//! Subscribes to exactly one named subject on the NATS broker and feeds
//! every payload through the codec into [`RelayState::apply`]. Connect
//! and subscribe failures are fatal -- the process must not silently run
//! with no data source -- while a payload that fails to decode is logged,
//! counted, and skipped.
//!
//! The adapter imposes no ordering or deduplication of its own: message
//! order is whatever the broker delivers, and two events for the same
//! entity may be applied out of producer order if the broker reorders
//! them.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use futures::StreamExt as _;
use tracing::{debug, info, warn};

use geotrace_codec::{DecodeError, Encoding, decode};

use crate::state::RelayState;

/// Errors raised while establishing the broker subscription.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Failed to connect to or subscribe on the NATS server.
    #[error("NATS error: {0}")]
    Nats(String),
}

/// NATS client wrapper for the ingestion side of the relay.
pub struct IngestClient {
    client: async_nats::Client,
}

impl IngestClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Nats`] if the connection cannot be
    /// established. This is fatal at startup.
    pub async fn connect(url: &str) -> Result<Self, IngestError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| IngestError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to the named position subject.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Nats`] if the subscription fails. This is
    /// fatal at startup.
    pub async fn subscribe(&self, subject: &str) -> Result<async_nats::Subscriber, IngestError> {
        debug!(subject = subject, "subscribing to position subject");
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| IngestError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "subscribed to position subject");
        Ok(subscriber)
    }
}

impl std::fmt::Debug for IngestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestClient")
            .field("connected", &true)
            .finish()
    }
}

/// Drive the ingestion loop until the subscription closes.
///
/// Runs forever under normal operation; returns when the broker
/// connection is gone and the subscriber stream ends.
pub async fn run_ingest(mut subscriber: async_nats::Subscriber, state: Arc<RelayState>) {
    info!("ingestion loop started");
    while let Some(message) = subscriber.next().await {
        handle_payload(&state, &message.payload).await;
    }
    warn!("ingestion subscription closed");
}

/// Decode one broker payload and apply it to the relay.
///
/// Decode failures are per-message and non-fatal: the payload is
/// dropped, the drop is counted, and ingestion continues.
pub async fn handle_payload(state: &Arc<RelayState>, payload: &[u8]) {
    let metrics = state.metrics();
    metrics.received.fetch_add(1, Ordering::Relaxed);

    match decode(payload) {
        Ok(decoded) => {
            match decoded.encoding {
                Encoding::Binary => {
                    metrics.decoded_binary.fetch_add(1, Ordering::Relaxed);
                }
                Encoding::Text => {
                    metrics.decoded_text.fetch_add(1, Ordering::Relaxed);
                }
            }
            debug!(
                entity = %decoded.event.entity_id,
                sequence = decoded.event.sequence,
                encoding = ?decoded.encoding,
                "position event ingested"
            );
            state.apply(decoded.event).await;
        }
        Err(DecodeError::UnrecognizedPayload) => {
            metrics.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(bytes = payload.len(), "unrecognized payload dropped");
        }
        Err(e) => {
            metrics.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(error = %e, "invalid payload dropped");
        }
    }
}
