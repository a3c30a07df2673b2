//! Textual fallback encoding for producer position reports.
//!
//! A JSON document carrying the same logical fields as the binary
//! [`PositionReport`](crate::wire::PositionReport), used by producers
//! that cannot speak the binary schema. Field names mirror the binary
//! layout so the two encodings stay in lockstep.

use serde::{Deserialize, Serialize};

use geotrace_types::PositionEvent;

/// A latitude/longitude pair in the textual encoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

/// One producer position report in the textual fallback encoding.
///
/// Every field is required; a document missing any of them fails the
/// decode outright (no partial decode). Extra fields from richer
/// producers are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextReport {
    /// Producer-assigned entity identifier.
    pub id: String,
    /// Reported position.
    pub pos: TextPoint,
    /// Speed in meters per second.
    pub speed: f64,
    /// Heading in degrees from true north.
    pub heading: f64,
    /// Report instant as milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Producer-assigned monotonic sequence counter.
    pub seq: u64,
}

impl From<&PositionEvent> for TextReport {
    fn from(event: &PositionEvent) -> Self {
        Self {
            id: event.entity_id.as_str().to_owned(),
            pos: TextPoint {
                lat: event.position.lat,
                lon: event.position.lon,
            },
            speed: event.speed,
            heading: event.heading,
            timestamp_ms: event.timestamp.timestamp_millis(),
            seq: event.sequence,
        }
    }
}
