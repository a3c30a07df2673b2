//! In-memory per-entity state store with bounded recent-history trails.
//!
//! [`TrackStore`] keeps one row per entity: the latest
//! [`PositionEvent`](geotrace_types::PositionEvent) and a FIFO trail of
//! up to `max_trail_length` recent points, oldest
//! first. Rows are created on the first event for an entity and mutated
//! on every subsequent one; they are never deleted, so the entity set
//! grows without bound over the process lifetime (accepted limitation of
//! the relay -- stale vehicles persist until restart).
//!
//! The store is a plain single-writer structure: `upsert` takes `&mut
//! self` and `snapshot` takes `&self`, and the relay serializes both
//! under one exclusion domain so a snapshot never observes a row whose
//! `latest` and `trail` disagree.
//!
//! Events are applied in arrival order. The producer-assigned `sequence`
//! field is stored and forwarded but deliberately not consulted: if the
//! broker reorders two reports for one entity, the later arrival wins
//! even when it is the older report. A sequence-gated "apply only if
//! newer" rule would be a behavioural change and is intentionally not
//! implemented.

pub mod store;

pub use store::{TrackStore, DEFAULT_MAX_TRAIL_LENGTH};
