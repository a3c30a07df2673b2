//! Observer wire protocol.
//!
//! Both directions of the observer `WebSocket` carry JSON text frames
//! whose shape is a closed tagged enum. Keeping the kinds closed means an
//! unrecognized `type` tag surfaces as a single deserialization error at
//! the edge -- handled once, logged, never fatal -- instead of string
//! matching scattered through the code.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EntityId;
use crate::structs::{EntityState, PositionEvent, TrackPoint};

/// Messages sent from the relay to an observer connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerMessage {
    /// Full state of every known entity. Sent exactly once per
    /// connection, before any incremental update.
    Snapshot {
        /// All known entities with their trails.
        entities: Vec<EntityState>,
    },
    /// One incremental position update, sent on every successful
    /// ingestion.
    Update {
        /// The ingested event, forwarded as decoded.
        event: PositionEvent,
    },
    /// Empty-payload liveness reply to a client probe.
    KeepaliveAck,
    /// Reply to a [`ClientMessage::TrailQuery`].
    TrailResponse {
        /// The queried entity.
        entity_id: EntityId,
        /// The entity's trail, oldest first; empty when the entity is
        /// unknown.
        trail: Vec<TrackPoint>,
    },
}

/// Messages sent from an observer to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientMessage {
    /// Identification message sent once, immediately after the
    /// connection opens.
    Hello {
        /// Free-form observer identifier used in relay logs.
        client_id: String,
    },
    /// Empty-payload liveness probe; the relay answers with
    /// [`ServerMessage::KeepaliveAck`].
    KeepaliveProbe,
    /// Request the full trail of one entity, independent of the
    /// broadcast stream.
    TrailQuery {
        /// The entity whose trail is requested.
        entity_id: EntityId,
    },
}
