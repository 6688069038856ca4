//! Interning of patterns created by realtime data.
//!
//! Trips moved to another platform, and trips unknown to the static data,
//! need a [`TripPattern`] for their stop sequence. Updates for the same stop
//! sequence reuse one pattern so its timetable collects all such trips.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use moka::sync::Cache;

use crate::domain::{PatternId, StopPattern, Stops, Trip, TripPattern};

/// What makes two realtime patterns the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatternKey {
    /// Scheduled pattern the trips were moved away from; `None` for added
    /// trips.
    pub original: Option<PatternId>,
    pub route_id: String,
    pub stop_pattern: StopPattern,
}

/// Bounded cache of realtime patterns with id allocation.
///
/// Ids continue after the static network's patterns and are never reused.
/// An evicted pattern stays valid wherever it is still referenced; a later
/// request for the same key gets a fresh id.
pub struct RealtimePatternCache {
    patterns: Cache<PatternKey, Arc<TripPattern>>,
    next_id: AtomicU32,
}

impl RealtimePatternCache {
    /// `first_id` must be past every static pattern id.
    pub fn new(first_id: u32, capacity: u64) -> Self {
        Self {
            patterns: Cache::builder().max_capacity(capacity).build(),
            next_id: AtomicU32::new(first_id),
        }
    }

    /// The pattern for `key`, created on first use.
    pub fn get_or_create(
        &self,
        key: PatternKey,
        feed_id: &str,
        exemplar: Option<&Arc<Trip>>,
        stops: &Stops,
    ) -> Arc<TripPattern> {
        let init_key = key.clone();
        self.patterns.get_with(key, || {
            let id = PatternId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
            let mut pattern = TripPattern::realtime(
                id,
                feed_id,
                init_key.route_id,
                init_key.stop_pattern,
                init_key.original,
                stops,
            );
            if let Some(trip) = exemplar {
                pattern = pattern.with_exemplar(Arc::clone(trip));
            }
            Arc::new(pattern)
        })
    }

    /// Number of ids handed out so far, counting from the first.
    pub fn next_id(&self) -> u32 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for RealtimePatternCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimePatternCache")
            .field("entries", &self.patterns.entry_count())
            .field("next_id", &self.next_id())
            .finish()
    }
}
