//! Observer client configuration.

use std::time::Duration;

/// Default interval between keepalive probes.
pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Default retry budget for automatic reconnects.
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Default base delay for exponential backoff.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(2);

/// Default cap on the backoff delay.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(60);

/// Configuration for one [`ObserverClient`](crate::ObserverClient)
/// instance.
///
/// This is library surface, so it is a plain builder-style struct
/// rather than an environment loader: the embedding application decides
/// where the values come from.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay `WebSocket` URL (e.g. `ws://localhost:8080/ws/positions`).
    pub url: String,
    /// Identifier sent in the hello message, used in relay logs.
    pub client_id: String,
    /// Interval between keepalive probes while connected.
    pub keepalive_interval: Duration,
    /// Maximum automatic reconnect attempts before surfacing a
    /// persistent error.
    pub max_reconnect_attempts: u32,
    /// Base delay for exponential backoff.
    pub backoff_base: Duration,
    /// Cap on the backoff delay.
    pub backoff_max: Duration,
}

impl ClientConfig {
    /// Configuration for the given relay URL with default timing.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client_id: String::from("observer"),
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            backoff_base: DEFAULT_BACKOFF_BASE,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }

    /// Set the identifier sent in the hello message.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Set the keepalive probe interval.
    #[must_use]
    pub const fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the reconnect budget and backoff bounds.
    #[must_use]
    pub const fn with_backoff(
        mut self,
        max_attempts: u32,
        base: Duration,
        max: Duration,
    ) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }
}
