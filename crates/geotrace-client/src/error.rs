//! Error types for the observer client.

/// Errors surfaced by the observer client API.
///
/// Connection-level failures are not errors to the caller: they feed
/// the reconnection state machine and surface through
/// [`ClientState`](crate::ClientState) instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The client driver task has stopped and can no longer accept
    /// commands.
    #[error("client task stopped")]
    Stopped,
}
