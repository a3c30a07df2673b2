//! Relay server library for the Geotrace system.
//!
//! This crate is the distribution core: it ingests position events from
//! a publish/subscribe broker, maintains per-entity state with bounded
//! trails, and fans updates out to any number of observers over
//! persistent `WebSocket` connections.
//!
//! - **Ingestion** ([`ingest`]): one NATS subject, each payload decoded
//!   through `geotrace-codec` (binary schema with textual fallback);
//!   decode failures are counted and dropped, subscribe failures are
//!   fatal.
//! - **State** ([`state`]): a `geotrace-store` track store and the
//!   [`registry::ConnectionRegistry`] under one lock, so a newly joined
//!   observer receives a snapshot that is exactly consistent with the
//!   update stream that follows it.
//! - **Fan-out** ([`ws`], [`registry`]): bounded per-connection queues
//!   drained by the socket task; a slow observer is dropped instead of
//!   stalling the rest.
//! - **REST surface** ([`handlers`], [`router`]): status page, entity
//!   snapshot, and per-entity trail beside the stream.

pub mod error;
pub mod handlers;
pub mod ingest;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use ingest::{IngestClient, IngestError, run_ingest};
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{IngestCounters, IngestMetrics, RelayState};
