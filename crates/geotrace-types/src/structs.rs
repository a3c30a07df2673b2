//! Core data model for position tracking.
//!
//! A [`PositionEvent`] is one producer's report at one instant, decoded
//! from the wire and then treated as immutable. The relay keeps one
//! [`EntityState`] row per entity: the latest event plus a bounded trail
//! of recent [`TrackPoint`]s, oldest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EntityId;

/// A WGS84 position in double-precision degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point from latitude/longitude degrees.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether the coordinates are inside the valid WGS84 envelope.
    pub fn is_plausible(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// One producer's position report at one instant.
///
/// Constructed once per decoded message and never mutated. `speed` is
/// non-negative by producer convention and `heading` is 0-360 degrees;
/// neither is normalized by the relay. `sequence` is the producer's own
/// monotonic counter, forwarded as-is without validation or reordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PositionEvent {
    /// Stable identifier of the reporting entity.
    pub entity_id: EntityId,
    /// Reported position.
    pub position: GeoPoint,
    /// Scalar speed in meters per second.
    pub speed: f64,
    /// Heading in degrees from true north, producer-supplied.
    pub heading: f64,
    /// Producer-supplied report instant.
    pub timestamp: DateTime<Utc>,
    /// Producer-assigned monotonic sequence counter.
    pub sequence: u64,
}

impl PositionEvent {
    /// Project the event down to the position + timestamp pair stored in
    /// an entity's trail.
    pub const fn track_point(&self) -> TrackPoint {
        TrackPoint {
            position: self.position,
            timestamp: self.timestamp,
        }
    }
}

/// One historical point in an entity's trail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TrackPoint {
    /// Position at the time of the report.
    pub position: GeoPoint,
    /// Instant of the report.
    pub timestamp: DateTime<Utc>,
}

/// The current row for one entity as served to observers.
///
/// `trail` is insertion-ordered, oldest first, and bounded by the store's
/// configured trail length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EntityState {
    /// Most recent event for this entity.
    pub latest: PositionEvent,
    /// Recent history, oldest first.
    pub trail: Vec<TrackPoint>,
}
