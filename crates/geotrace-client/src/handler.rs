//! Observer-side message dispatch.

use geotrace_types::{EntityId, EntityState, PositionEvent, TrackPoint};

/// Receives relay messages routed by kind.
///
/// All methods default to no-ops so an implementation only overrides
/// the kinds it cares about. Message kinds the protocol does not know
/// never reach a handler: they are logged and dropped at the decode
/// edge.
pub trait ObserverHandler: Send + 'static {
    /// The full state of all entities, delivered once per connection
    /// before any update.
    fn on_snapshot(&mut self, entities: Vec<EntityState>) {
        let _ = entities;
    }

    /// One incremental position update.
    fn on_update(&mut self, event: PositionEvent) {
        let _ = event;
    }

    /// The relay acknowledged a keepalive probe.
    fn on_keepalive_ack(&mut self) {}

    /// The relay answered a trail query.
    fn on_trail_response(&mut self, entity_id: EntityId, trail: Vec<TrackPoint>) {
        let _ = (entity_id, trail);
    }
}
