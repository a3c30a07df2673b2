//! Fixed binary schema for producer position reports.
//!
//! Hand-written `prost` message definitions (field numbers are the wire
//! contract, so they live here rather than in a generated file):
//!
//! ```text
//! message PositionReport {
//!   string id           = 1;
//!   WirePoint pos       = 2;
//!   double speed        = 3;
//!   double heading      = 4;
//!   int64  timestamp_ms = 5;
//!   uint64 seq          = 6;
//! }
//! message WirePoint {
//!   double lat = 1;
//!   double lon = 2;
//! }
//! ```

use geotrace_types::PositionEvent;

/// A latitude/longitude pair on the binary wire.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WirePoint {
    /// Latitude in degrees.
    #[prost(double, tag = "1")]
    pub lat: f64,
    /// Longitude in degrees.
    #[prost(double, tag = "2")]
    pub lon: f64,
}

/// One producer position report in the fixed binary layout.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PositionReport {
    /// Producer-assigned entity identifier.
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// Reported position.
    #[prost(message, optional, tag = "2")]
    pub pos: ::core::option::Option<WirePoint>,
    /// Speed in meters per second.
    #[prost(double, tag = "3")]
    pub speed: f64,
    /// Heading in degrees from true north.
    #[prost(double, tag = "4")]
    pub heading: f64,
    /// Report instant as milliseconds since the Unix epoch.
    #[prost(int64, tag = "5")]
    pub timestamp_ms: i64,
    /// Producer-assigned monotonic sequence counter.
    #[prost(uint64, tag = "6")]
    pub seq: u64,
}

impl From<&PositionEvent> for PositionReport {
    fn from(event: &PositionEvent) -> Self {
        Self {
            id: event.entity_id.as_str().to_owned(),
            pos: Some(WirePoint {
                lat: event.position.lat,
                lon: event.position.lon,
            }),
            speed: event.speed,
            heading: event.heading,
            timestamp_ms: event.timestamp.timestamp_millis(),
            seq: event.sequence,
        }
    }
}
