//! Observable client connection state.

/// The connection status of an observer client. Exactly one is active
/// at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No connection and no attempt in flight.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The connection is open and the keepalive schedule is running.
    Connected,
}

/// A point-in-time view of the client state machine, published over a
/// `tokio::sync::watch` channel.
///
/// `exhausted` is the persistent-error surface: it becomes true when
/// the retry budget is spent and stays true until a manual reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientState {
    /// Current connection status.
    pub status: ConnectionStatus,
    /// Automatic reconnect attempts made since the last successful
    /// open (or manual reconnect).
    pub retries: u32,
    /// Whether the retry budget is spent; cleared only by a manual
    /// reconnect.
    pub exhausted: bool,
}
