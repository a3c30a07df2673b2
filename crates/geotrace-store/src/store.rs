//! The entity state map and its trail-eviction discipline.

use std::collections::BTreeMap;
use std::collections::VecDeque;

use geotrace_types::{EntityId, EntityState, PositionEvent, TrackPoint};

/// Default bound on per-entity trail length.
pub const DEFAULT_MAX_TRAIL_LENGTH: usize = 50;

/// One entity's row as held internally: latest event plus a deque trail
/// so front eviction is O(1).
#[derive(Debug, Clone)]
struct EntityRow {
    latest: PositionEvent,
    trail: VecDeque<TrackPoint>,
}

impl EntityRow {
    fn to_state(&self) -> EntityState {
        EntityState {
            latest: self.latest.clone(),
            trail: self.trail.iter().copied().collect(),
        }
    }
}

/// Keyed map from entity identifier to latest state and bounded trail.
///
/// `BTreeMap` keeps snapshot iteration deterministic (stable entity
/// ordering in every snapshot message), matching how the rest of the
/// workspace keys in-memory views.
#[derive(Debug)]
pub struct TrackStore {
    entities: BTreeMap<EntityId, EntityRow>,
    max_trail_length: usize,
}

impl TrackStore {
    /// Create a store with the given trail bound.
    pub const fn new(max_trail_length: usize) -> Self {
        Self {
            entities: BTreeMap::new(),
            max_trail_length,
        }
    }

    /// The current trail bound.
    pub const fn max_trail_length(&self) -> usize {
        self.max_trail_length
    }

    /// Change the trail bound.
    ///
    /// Affects future evictions only: a trail already longer than the
    /// new bound is trimmed on that entity's next write, never
    /// retroactively.
    pub const fn set_max_trail_length(&mut self, max_trail_length: usize) {
        self.max_trail_length = max_trail_length;
    }

    /// Number of known entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Apply one decoded event.
    ///
    /// Creates the entity row if absent, replaces `latest`, appends the
    /// event's track point, and evicts from the front while the trail
    /// exceeds the bound. The `while` loop keeps the invariant intact
    /// even when the bound was lowered between writes (bulk rehydration
    /// or a runtime reconfiguration).
    pub fn upsert(&mut self, event: PositionEvent) {
        use std::collections::btree_map::Entry;

        let point = event.track_point();
        let max = self.max_trail_length;
        let row = match self.entities.entry(event.entity_id.clone()) {
            Entry::Occupied(occupied) => {
                let row = occupied.into_mut();
                row.latest = event;
                row
            }
            Entry::Vacant(vacant) => vacant.insert(EntityRow {
                latest: event,
                trail: VecDeque::new(),
            }),
        };
        row.trail.push_back(point);
        while row.trail.len() > max {
            row.trail.pop_front();
        }
    }

    /// A consistent point-in-time view of every known entity.
    ///
    /// Callers must hold the same exclusion domain that serializes
    /// `upsert`; under that discipline no entity can appear with a
    /// half-applied update.
    pub fn snapshot(&self) -> Vec<EntityState> {
        self.entities.values().map(EntityRow::to_state).collect()
    }

    /// The trail of one entity, oldest first, or `None` for an unknown
    /// entity.
    pub fn trail(&self, entity_id: &EntityId) -> Option<Vec<TrackPoint>> {
        self.entities
            .get(entity_id)
            .map(|row| row.trail.iter().copied().collect())
    }

    /// The latest event for one entity, or `None` for an unknown entity.
    pub fn latest(&self, entity_id: &EntityId) -> Option<&PositionEvent> {
        self.entities.get(entity_id).map(|row| &row.latest)
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TRAIL_LENGTH)
    }
}
