//! Wire codec for producer position payloads.
//!
//! Producers publish one payload per message on the broker channel. The
//! payload is either the fixed binary schema ([`wire::PositionReport`])
//! or a textual JSON fallback ([`text::TextReport`]) of the same logical
//! fields. [`decode`] tries the binary schema first and falls back to
//! the textual form; if both fail the payload is unrecognized and the
//! caller drops it (counting the drop -- the codec itself never logs).
//!
//! There is no partial decode: a [`PositionEvent`] is either fully
//! populated and validated or not produced at all. Validation rejects
//! empty entity identifiers, coordinates outside the WGS84 envelope,
//! and timestamps that do not map to a real instant.

pub mod text;
pub mod wire;

use chrono::DateTime;
use prost::Message as _;

use geotrace_types::{EntityId, GeoPoint, PositionEvent};

use crate::text::TextReport;
use crate::wire::PositionReport;

/// Errors produced while decoding a producer payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload matched neither the binary schema nor the textual
    /// fallback.
    #[error("unrecognized payload")]
    UnrecognizedPayload,

    /// The payload decoded structurally but a field failed validation.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// Serialization failure while encoding an event (producer/test
    /// helpers only; the decode path never surfaces this).
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Which encoding a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// The fixed binary schema.
    Binary,
    /// The textual JSON fallback.
    Text,
}

/// A successfully decoded payload, tagged with the encoding that
/// produced it so the ingestion adapter can keep per-encoding counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// The fully populated event.
    pub event: PositionEvent,
    /// The encoding the payload arrived in.
    pub encoding: Encoding,
}

/// Decode a raw broker payload into a [`PositionEvent`].
///
/// Attempts the binary schema first. If the binary decode fails
/// structurally, attempts the textual fallback. A payload that decodes
/// structurally in either encoding but fails field validation is an
/// [`DecodeError::InvalidField`]; a payload that matches neither
/// encoding is [`DecodeError::UnrecognizedPayload`].
///
/// # Errors
///
/// See above; every error is per-message and non-fatal to the caller.
pub fn decode(payload: &[u8]) -> Result<Decoded, DecodeError> {
    if let Ok(report) = PositionReport::decode(payload) {
        let event = event_from_binary(report)?;
        return Ok(Decoded {
            event,
            encoding: Encoding::Binary,
        });
    }

    match serde_json::from_slice::<TextReport>(payload) {
        Ok(report) => {
            let event = event_from_text(report)?;
            Ok(Decoded {
                event,
                encoding: Encoding::Text,
            })
        }
        Err(_) => Err(DecodeError::UnrecognizedPayload),
    }
}

/// Encode an event in the fixed binary schema (producer/test helper).
pub fn encode_binary(event: &PositionEvent) -> Vec<u8> {
    PositionReport::from(event).encode_to_vec()
}

/// Encode an event in the textual fallback encoding (producer/test
/// helper).
///
/// # Errors
///
/// Returns [`DecodeError::Serde`] if JSON serialization fails.
pub fn encode_text(event: &PositionEvent) -> Result<Vec<u8>, DecodeError> {
    Ok(serde_json::to_vec(&TextReport::from(event))?)
}

/// Convert a structurally valid binary report into a validated event.
fn event_from_binary(report: PositionReport) -> Result<PositionEvent, DecodeError> {
    let pos = report
        .pos
        .ok_or_else(|| DecodeError::InvalidField("missing position".to_owned()))?;
    build_event(
        report.id,
        GeoPoint::new(pos.lat, pos.lon),
        report.speed,
        report.heading,
        report.timestamp_ms,
        report.seq,
    )
}

/// Convert a structurally valid textual report into a validated event.
fn event_from_text(report: TextReport) -> Result<PositionEvent, DecodeError> {
    build_event(
        report.id,
        GeoPoint::new(report.pos.lat, report.pos.lon),
        report.speed,
        report.heading,
        report.timestamp_ms,
        report.seq,
    )
}

/// Validate the shared logical fields and assemble the event.
fn build_event(
    id: String,
    position: GeoPoint,
    speed: f64,
    heading: f64,
    timestamp_ms: i64,
    sequence: u64,
) -> Result<PositionEvent, DecodeError> {
    let entity_id = EntityId::new(id);
    if entity_id.is_empty() {
        return Err(DecodeError::InvalidField("empty entity id".to_owned()));
    }
    if !position.is_plausible() {
        return Err(DecodeError::InvalidField(format!(
            "coordinates out of range: lat={}, lon={}",
            position.lat, position.lon
        )));
    }
    let timestamp = DateTime::from_timestamp_millis(timestamp_ms).ok_or_else(|| {
        DecodeError::InvalidField(format!("timestamp out of range: {timestamp_ms}"))
    })?;

    Ok(PositionEvent {
        entity_id,
        position,
        speed,
        heading,
        timestamp,
        sequence,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_event() -> PositionEvent {
        PositionEvent {
            entity_id: EntityId::new("vehicle-001"),
            position: GeoPoint::new(28.7041, 77.1025),
            speed: 11.25,
            heading: 182.5,
            timestamp: DateTime::from_timestamp_millis(1_700_000_123_456).unwrap(),
            sequence: 42,
        }
    }

    #[test]
    fn binary_round_trip() {
        let event = sample_event();
        let payload = encode_binary(&event);
        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded.encoding, Encoding::Binary);
        assert_eq!(decoded.event, event);
    }

    #[test]
    fn textual_round_trip() {
        let event = sample_event();
        let payload = encode_text(&event).unwrap();
        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded.encoding, Encoding::Text);
        assert_eq!(decoded.event, event);
    }

    #[test]
    fn both_encodings_decode_to_identical_events() {
        let event = sample_event();
        let from_binary = decode(&encode_binary(&event)).unwrap().event;
        let from_text = decode(&encode_text(&event).unwrap()).unwrap().event;
        assert_eq!(from_binary, from_text);
    }

    #[test]
    fn garbage_is_unrecognized() {
        let result = decode(b"\x00\x01definitely not a report");
        assert!(matches!(result, Err(DecodeError::UnrecognizedPayload)));
    }

    #[test]
    fn empty_payload_is_rejected() {
        // Zero bytes is a structurally valid (all-defaults) protobuf
        // message, so it must die in validation, not slip through.
        let result = decode(b"");
        assert!(result.is_err());
    }

    #[test]
    fn textual_with_missing_field_is_unrecognized() {
        // `speed` missing: fails the binary decode AND the strict
        // textual decode.
        let payload = br#"{"id":"v1","pos":{"lat":1.0,"lon":2.0},"heading":0.0,"timestamp_ms":0,"seq":1}"#;
        let result = decode(payload);
        assert!(matches!(result, Err(DecodeError::UnrecognizedPayload)));
    }

    #[test]
    fn textual_with_extra_fields_still_decodes() {
        let payload = br#"{"id":"v1","pos":{"lat":1.0,"lon":2.0},"speed":3.0,"heading":90.0,"timestamp_ms":1700000000000,"seq":9,"battery":88}"#;
        let decoded = decode(payload).unwrap();
        assert_eq!(decoded.encoding, Encoding::Text);
        assert_eq!(decoded.event.sequence, 9);
    }

    #[test]
    fn out_of_range_coordinates_are_invalid() {
        let mut event = sample_event();
        event.position = GeoPoint::new(91.0, 0.0);
        let payload = encode_binary(&event);
        let result = decode(&payload);
        assert!(matches!(result, Err(DecodeError::InvalidField(_))));
    }

    #[test]
    fn empty_entity_id_is_invalid() {
        let mut event = sample_event();
        event.entity_id = EntityId::new("");
        let payload = encode_binary(&event);
        let result = decode(&payload);
        assert!(matches!(result, Err(DecodeError::InvalidField(_))));
    }

    #[test]
    fn heading_and_sequence_are_forwarded_untouched() {
        // The relay does not normalize producer values.
        let mut event = sample_event();
        event.heading = 359.9;
        event.sequence = u64::MAX;
        let decoded = decode(&encode_binary(&event)).unwrap();
        assert!((decoded.event.heading - 359.9).abs() < f64::EPSILON);
        assert_eq!(decoded.event.sequence, u64::MAX);
    }
}
