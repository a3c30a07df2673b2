//! Stable identifier for a tracked producer.
//!
//! Producers assign their own identifiers (`vehicle-001` style strings on
//! the wire), so [`EntityId`] wraps a [`String`] rather than a UUID. The
//! newtype keeps entity identifiers from mixing with other strings at
//! compile time and gives the rest of the workspace one place to hang
//! ordering and display behaviour.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Stable identifier for a tracked entity (vehicle), assigned by the
/// producer and never rewritten by the relay.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityId(pub String);

impl EntityId {
    /// Create an identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a `&str`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is the empty string.
    ///
    /// Empty identifiers are rejected at decode time; this exists so the
    /// codec can express that check without reaching into the field.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}
