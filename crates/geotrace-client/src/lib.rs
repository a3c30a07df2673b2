//! Observer client for the Geotrace relay.
//!
//! The consumer-side counterpart of the relay's fan-out server: it
//! establishes a persistent `WebSocket` connection, identifies itself,
//! keeps the link alive with periodic probes, routes inbound messages
//! by kind to an [`ObserverHandler`], and survives an unreliable
//! network with a bounded-exponential-backoff reconnection state
//! machine.
//!
//! # State machine
//!
//! Exactly one of `disconnected` / `connecting` / `connected` is active
//! at any time ([`ConnectionStatus`]). Abnormal closures schedule a
//! reconnect after `min(base * 2^retries, max)`; a manual
//! [`disconnect`](ObserverClient::disconnect) suppresses automatic
//! retry until a manual [`reconnect`](ObserverClient::reconnect); a
//! spent retry budget surfaces as a persistent error on
//! [`ClientState`] rather than a crash. A "network became reachable"
//! signal triggers one immediate attempt, bypassing the backoff delay.
//!
//! # Example
//!
//! ```no_run
//! use geotrace_client::{ClientConfig, ObserverClient, ObserverHandler};
//! use geotrace_types::PositionEvent;
//!
//! struct LogHandler;
//!
//! impl ObserverHandler for LogHandler {
//!     fn on_update(&mut self, event: PositionEvent) {
//!         println!("{} moved to {:?}", event.entity_id, event.position);
//!     }
//! }
//!
//! # async fn run() {
//! let config = ClientConfig::new("ws://localhost:8080/ws/positions");
//! let client = ObserverClient::spawn(config, LogHandler);
//! # let _ = client;
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod policy;
pub mod status;

// Re-export primary types for convenience.
pub use client::ObserverClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use handler::ObserverHandler;
pub use policy::{ReconnectPolicy, RetryDecision};
pub use status::{ClientState, ConnectionStatus};
