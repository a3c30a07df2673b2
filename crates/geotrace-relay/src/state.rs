//! Shared relay state: the entity store and the connection registry
//! under one exclusion domain.
//!
//! [`RelayState`] wraps a [`TrackStore`] and a [`ConnectionRegistry`] in
//! a single async [`Mutex`]. Holding one lock across "apply update +
//! broadcast" and across "compute snapshot + add to set" keeps snapshot
//! and stream consistent: a newly registered observer's snapshot
//! contains every update applied before registration, and every update
//! applied after registration lands in its queue behind the snapshot --
//! nothing missing, nothing duplicated. Every critical section is a store
//! write or a round of non-blocking `try_send`s -- never socket I/O --
//! so the single lock stays cheap at this volume.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use geotrace_store::TrackStore;
use geotrace_types::{EntityId, EntityState, PositionEvent, ServerMessage, TrackPoint};

use crate::registry::{ConnectionId, ConnectionRegistry};

/// Default capacity of each connection's outbound queue.
///
/// An observer that falls further behind than this many messages is
/// dropped and unregistered rather than allowed to stall the broadcast.
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 256;

/// Ingestion counters, updated by the ingestion adapter and served on
/// the status page.
#[derive(Debug, Default)]
pub struct IngestMetrics {
    /// Payloads received from the broker.
    pub received: AtomicU64,
    /// Payloads decoded via the binary schema.
    pub decoded_binary: AtomicU64,
    /// Payloads decoded via the textual fallback.
    pub decoded_text: AtomicU64,
    /// Payloads dropped because neither decode succeeded.
    pub dropped: AtomicU64,
}

/// A point-in-time copy of the ingestion counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestCounters {
    /// Payloads received from the broker.
    pub received: u64,
    /// Payloads decoded via the binary schema.
    pub decoded_binary: u64,
    /// Payloads decoded via the textual fallback.
    pub decoded_text: u64,
    /// Payloads dropped because neither decode succeeded.
    pub dropped: u64,
}

impl IngestMetrics {
    /// Read all counters at once.
    pub fn counters(&self) -> IngestCounters {
        IngestCounters {
            received: self.received.load(Ordering::Relaxed),
            decoded_binary: self.decoded_binary.load(Ordering::Relaxed),
            decoded_text: self.decoded_text.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// The store + registry pair guarded by the relay lock.
#[derive(Debug)]
struct RelayCore {
    store: TrackStore,
    registry: ConnectionRegistry,
}

/// Shared state for the relay server.
///
/// Wrapped in [`Arc`] and injected into the Axum router via its `State`
/// extractor; the ingestion adapter holds a clone of the same `Arc`.
#[derive(Debug)]
pub struct RelayState {
    core: Mutex<RelayCore>,
    send_queue_capacity: usize,
    metrics: IngestMetrics,
}

impl RelayState {
    /// Create relay state with the given trail bound and per-connection
    /// queue capacity (clamped to at least 1 so the snapshot message
    /// always fits a fresh queue).
    pub fn new(max_trail_length: usize, send_queue_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            core: Mutex::new(RelayCore {
                store: TrackStore::new(max_trail_length),
                registry: ConnectionRegistry::new(),
            }),
            send_queue_capacity: send_queue_capacity.max(1),
            metrics: IngestMetrics::default(),
        })
    }

    /// The ingestion counters.
    pub const fn metrics(&self) -> &IngestMetrics {
        &self.metrics
    }

    /// Register a new observer connection.
    ///
    /// Queues one [`ServerMessage::Snapshot`] of the current store and
    /// adds the connection to the broadcast set, both under the relay
    /// lock. Returns the connection id and the receiving half of the
    /// outbound queue for the caller's writer task to drain.
    pub async fn register(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(self.send_queue_capacity);
        let id = ConnectionId::new();

        let mut core = self.core.lock().await;
        let snapshot = ServerMessage::Snapshot {
            entities: core.store.snapshot(),
        };
        // A fresh queue with capacity >= 1 always has room for the
        // snapshot; a failure here means the receiver is already gone,
        // in which case the connection is simply not registered.
        if tx.try_send(snapshot).is_ok() {
            core.registry.register(id, tx);
        }
        drop(core);

        debug!(connection = %id, "observer registered");
        (id, rx)
    }

    /// Remove an observer connection from the broadcast set. Idempotent.
    pub async fn unregister(&self, id: ConnectionId) {
        let mut core = self.core.lock().await;
        core.registry.unregister(id);
        drop(core);
        debug!(connection = %id, "observer unregistered");
    }

    /// Apply one ingested event: update the store and broadcast the
    /// incremental update to every open connection, atomically with
    /// respect to [`register`](Self::register).
    pub async fn apply(&self, event: PositionEvent) {
        let mut core = self.core.lock().await;
        core.store.upsert(event.clone());
        let dropped = core.registry.broadcast(&ServerMessage::Update { event });
        drop(core);

        for id in dropped {
            warn!(connection = %id, "observer queue full or closed, unregistered");
        }
    }

    /// A consistent snapshot of all entities (REST surface).
    pub async fn snapshot(&self) -> Vec<EntityState> {
        self.core.lock().await.store.snapshot()
    }

    /// The trail of one entity, or `None` when unknown (point query).
    pub async fn trail(&self, entity_id: &EntityId) -> Option<Vec<TrackPoint>> {
        self.core.lock().await.store.trail(entity_id)
    }

    /// Number of known entities.
    pub async fn entity_count(&self) -> usize {
        self.core.lock().await.store.entity_count()
    }

    /// Number of open observer connections.
    pub async fn connection_count(&self) -> usize {
        self.core.lock().await.registry.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::DateTime;
    use geotrace_types::GeoPoint;

    use super::*;

    fn event(id: &str, n: u64) -> PositionEvent {
        #[allow(clippy::cast_precision_loss)]
        let coord = n as f64;
        PositionEvent {
            entity_id: EntityId::new(id),
            position: GeoPoint::new(coord, coord),
            speed: 5.0,
            heading: 90.0,
            timestamp: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            sequence: n,
        }
    }

    fn snapshot_entities(msg: ServerMessage) -> Option<Vec<EntityState>> {
        match msg {
            ServerMessage::Snapshot { entities } => Some(entities),
            _ => None,
        }
    }

    fn update_event(msg: ServerMessage) -> Option<PositionEvent> {
        match msg {
            ServerMessage::Update { event } => Some(event),
            _ => None,
        }
    }

    #[tokio::test]
    async fn new_observer_gets_snapshot_before_updates() {
        let state = RelayState::new(3, 16);

        // Three updates happen before the observer joins.
        for n in 0..3 {
            state.apply(event("a", n)).await;
        }

        let (_id, mut rx) = state.register().await;
        state.apply(event("a", 3)).await;

        let first = rx.recv().await.unwrap();
        let entities = snapshot_entities(first).unwrap();
        assert_eq!(entities.len(), 1);
        let a = entities.first().unwrap();
        assert_eq!(a.latest.sequence, 2);
        assert_eq!(a.trail.len(), 3);

        let second = rx.recv().await.unwrap();
        assert_eq!(update_event(second).unwrap().sequence, 3);
    }

    #[tokio::test]
    async fn snapshot_trails_are_bounded_per_entity() {
        let state = RelayState::new(3, 16);
        for n in 0..5 {
            state.apply(event("a", n)).await;
        }
        state.apply(event("b", 0)).await;

        let (_id, mut rx) = state.register().await;
        let first = rx.recv().await.unwrap();
        let entities = snapshot_entities(first).unwrap();
        assert_eq!(entities.len(), 2);

        let a = entities
            .iter()
            .find(|e| e.latest.entity_id.as_str() == "a")
            .unwrap();
        assert_eq!(a.trail.len(), 3);
        let b = entities
            .iter()
            .find(|e| e.latest.entity_id.as_str() == "b")
            .unwrap();
        assert_eq!(b.trail.len(), 1);
    }

    #[tokio::test]
    async fn one_stalled_observer_does_not_block_the_rest() {
        // Queue capacity 2: one slot for the snapshot, one for a single
        // update; the stalled observer overflows on the second update.
        let state = RelayState::new(10, 2);

        let (_stalled_id, stalled_rx) = state.register().await;
        let (_live_id, mut live_rx) = state.register().await;
        assert_eq!(state.connection_count().await, 2);

        // Never drain the stalled queue.
        let _keep_alive = stalled_rx;

        // The live observer drains after every update and receives the
        // full stream; the stalled one overflows on the second update
        // and is unregistered without delaying anything.
        let first = live_rx.recv().await.unwrap();
        assert!(matches!(first, ServerMessage::Snapshot { .. }));
        for n in 0..5 {
            state.apply(event("a", n)).await;
            let msg = live_rx.recv().await.unwrap();
            assert_eq!(update_event(msg).unwrap().sequence, n);
        }

        assert_eq!(state.connection_count().await, 1);
    }

    #[tokio::test]
    async fn unregister_is_idempotent_through_state() {
        let state = RelayState::new(3, 8);
        let (id, rx) = state.register().await;
        drop(rx);
        state.unregister(id).await;
        state.unregister(id).await;
        assert_eq!(state.connection_count().await, 0);
    }
}
