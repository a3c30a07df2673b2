//! Shared type definitions for the Geotrace relay.
//!
//! This crate holds the data model that flows through every other crate:
//! the per-entity position report ([`PositionEvent`]), the per-entity
//! row served to observers ([`EntityState`]), and the closed tagged
//! wire-protocol enums exchanged over the observer `WebSocket`
//! ([`ServerMessage`], [`ClientMessage`]).
//!
//! Types that cross the wire derive `ts-rs` bindings so the TypeScript
//! dashboard consumes the exact same protocol definitions.

pub mod ids;
pub mod protocol;
pub mod structs;

pub use ids::EntityId;
pub use protocol::{ClientMessage, ServerMessage};
pub use structs::{EntityState, GeoPoint, PositionEvent, TrackPoint};
