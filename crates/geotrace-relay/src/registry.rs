//! The set of currently open observer connections.
//!
//! [`ConnectionRegistry`] is an explicit owned collection mutated only
//! through [`register`](ConnectionRegistry::register),
//! [`unregister`](ConnectionRegistry::unregister), and
//! [`broadcast`](ConnectionRegistry::broadcast) -- it is never exposed
//! directly, so there is no ad hoc shared mutation of the connection
//! set.
//!
//! Each connection is represented by the sending half of a bounded
//! [`mpsc`] queue; a writer task owned by the `WebSocket` handler drains
//! the queue into the socket. Broadcast uses `try_send` so a stalled or
//! dead observer can never block delivery to the others: a full or
//! closed queue gets the connection unregistered on the spot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use geotrace_types::ServerMessage;

/// Unique identifier for one observer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a fresh connection identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracks the sending half of every open observer connection.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, mpsc::Sender<ServerMessage>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
        }
    }

    /// Number of connections currently in the active set.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the active set is empty.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Add a connection to the active set.
    ///
    /// The caller is responsible for having queued the snapshot message
    /// on `tx` first, under the same exclusion domain as this call, so
    /// the connection never sees an incremental update that precedes
    /// its snapshot.
    pub fn register(&mut self, id: ConnectionId, tx: mpsc::Sender<ServerMessage>) {
        self.connections.insert(id, tx);
    }

    /// Remove a connection from the active set.
    ///
    /// Idempotent: unregistering twice, or a connection that was never
    /// registered, is a no-op.
    pub fn unregister(&mut self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Queue a message on every connection currently in the active set.
    ///
    /// Connections whose queue is full or whose receiver is gone are
    /// removed from the set and returned so the caller can log them;
    /// delivery to the remaining connections is unaffected.
    pub fn broadcast(&mut self, message: &ServerMessage) -> Vec<ConnectionId> {
        let mut dropped = Vec::new();
        for (&id, tx) in &self.connections {
            match tx.try_send(message.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_) | TrySendError::Closed(_)) => dropped.push(id),
            }
        }
        for id in &dropped {
            self.connections.remove(id);
        }
        dropped
    }
}
