//! The writer's working copy of realtime timetables.
//!
//! A timetable reachable from a published [`Snapshot`] is never mutated.
//! The first write to a `(pattern, date)` in a generation installs a fresh
//! copy and marks the key dirty; later writes in the same generation edit
//! that copy in place. `commit` reindexes the dirty copies and publishes a
//! new snapshot sharing every timetable with the buffer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::domain::{RealTimeState, TripId, TripPattern, TripSchedule};
use crate::network::TransitData;
use crate::realtime::UpdateError;
use crate::timetable::Timetable;

use super::snapshot::{Snapshot, TimetableKey, resolve_in};

#[derive(Debug)]
pub struct TimetableBuffer {
    network: Arc<TransitData>,
    timetables: HashMap<TimetableKey, Arc<Timetable>>,
    added_patterns: HashMap<(TripId, NaiveDate), Arc<TripPattern>>,
    /// Keys whose timetable was copied in the current generation.
    dirty: HashSet<TimetableKey>,
    /// Set by removals, which leave nothing in `dirty` to reindex.
    changed: bool,
    generation: u64,
    index_threshold: usize,
    last_snapshot: Arc<Snapshot>,
}

impl TimetableBuffer {
    pub fn new(network: Arc<TransitData>, index_threshold: usize) -> Self {
        let last_snapshot = Arc::new(Snapshot::empty(Arc::clone(&network)));
        Self {
            network,
            timetables: HashMap::new(),
            added_patterns: HashMap::new(),
            dirty: HashSet::new(),
            changed: false,
            generation: 0,
            index_threshold,
            last_snapshot,
        }
    }

    pub fn network(&self) -> &Arc<TransitData> {
        &self.network
    }

    /// The timetable for `pattern` on `date` as the writer currently sees it.
    pub fn resolve(&self, pattern: &Arc<TripPattern>, date: NaiveDate) -> Arc<Timetable> {
        resolve_in(&self.network, &self.timetables, pattern, date)
    }

    /// Whether anything changed since the last commit.
    pub fn is_dirty(&self) -> bool {
        self.changed || !self.dirty.is_empty()
    }

    /// Generation of the last committed snapshot.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_snapshot(&self) -> &Arc<Snapshot> {
        &self.last_snapshot
    }

    /// The realtime pattern `trip` was last installed on for `date`.
    pub fn added_pattern(&self, trip: &TripId, date: NaiveDate) -> Option<&Arc<TripPattern>> {
        self.added_patterns.get(&(trip.clone(), date))
    }

    /// Remember that `trip` runs on the realtime `pattern` on `date`.
    pub fn set_added_pattern(&mut self, trip: TripId, date: NaiveDate, pattern: Arc<TripPattern>) {
        self.added_patterns.insert((trip, date), pattern);
        self.changed = true;
    }

    /// Install `schedule` as the row for its trip in `pattern` on `date`.
    ///
    /// A trip absent from the timetable is appended only when the schedule
    /// is for an added or modified trip.
    pub fn update(
        &mut self,
        pattern: &Arc<TripPattern>,
        schedule: TripSchedule,
        date: NaiveDate,
    ) -> Result<(), UpdateError> {
        if schedule.num_stops() != pattern.num_stops() {
            return Err(UpdateError::StopCountMismatch {
                expected: pattern.num_stops(),
                actual: schedule.num_stops(),
            });
        }
        let row = self.resolve(pattern, date).trip_index(schedule.trip_id());
        if row.is_none()
            && !matches!(
                schedule.state(),
                RealTimeState::Added | RealTimeState::Modified
            )
        {
            return Err(UpdateError::TripNotFoundInPattern(
                schedule.trip_id().clone(),
            ));
        }

        let timetable = self.writable(pattern, date);
        trace!(trip = %schedule.trip_id(), pattern = %pattern.id(), %date, state = ?schedule.state(), "buffering schedule");
        match row {
            Some(row) => timetable.set_trip(row, Arc::new(schedule)),
            None => timetable.add_trip(Arc::new(schedule)),
        }
        Ok(())
    }

    /// Remove `trip` from the realtime pattern it was moved to on `date`
    /// and forget the association. Returns whether there was one.
    pub fn revert_trip_to_scheduled_pattern(&mut self, trip: &TripId, date: NaiveDate) -> bool {
        let Some(pattern) = self.added_patterns.remove(&(trip.clone(), date)) else {
            return false;
        };
        self.changed = true;
        if self.resolve(&pattern, date).trip_index(trip).is_some() {
            self.writable(&pattern, date).remove_trip(trip);
        }
        trace!(%trip, pattern = %pattern.id(), %date, "reverted to scheduled pattern");
        true
    }

    /// Drop all realtime data whose pattern belongs to `feed_id`.
    /// Returns whether anything was removed.
    pub fn clear(&mut self, feed_id: &str) -> bool {
        let before = self.timetables.len() + self.added_patterns.len();
        self.timetables
            .retain(|_, timetable| timetable.pattern().feed_id() != feed_id);
        self.added_patterns
            .retain(|_, pattern| pattern.feed_id() != feed_id);
        let timetables = &self.timetables;
        self.dirty.retain(|key| timetables.contains_key(key));

        let removed = before - (self.timetables.len() + self.added_patterns.len());
        if removed > 0 {
            debug!(feed = feed_id, removed, "cleared realtime data");
            self.changed = true;
        }
        removed > 0
    }

    /// Drop realtime data for service dates on or before `date`.
    /// Returns whether anything was removed.
    pub fn purge_expired_data(&mut self, date: NaiveDate) -> bool {
        let before = self.timetables.len() + self.added_patterns.len();
        self.timetables.retain(|key, _| key.service_date > date);
        self.added_patterns.retain(|(_, day), _| *day > date);
        self.dirty.retain(|key| key.service_date > date);

        let removed = before - (self.timetables.len() + self.added_patterns.len());
        if removed > 0 {
            debug!(%date, removed, "purged expired realtime data");
            self.changed = true;
        }
        removed > 0
    }

    /// Publish the buffer's contents.
    ///
    /// Without changes and without `force` the previous snapshot is
    /// returned as is.
    pub fn commit(&mut self, force: bool) -> Arc<Snapshot> {
        if !force && !self.is_dirty() {
            return Arc::clone(&self.last_snapshot);
        }

        let reindexed = self.dirty.len();
        for key in self.dirty.drain() {
            if let Some(timetable) = self.timetables.get_mut(&key) {
                Arc::make_mut(timetable).finish(self.index_threshold);
            }
        }
        self.changed = false;
        self.generation += 1;

        let snapshot = Arc::new(Snapshot::new(
            Arc::clone(&self.network),
            self.timetables.clone(),
            self.added_patterns.clone(),
            self.generation,
        ));
        debug!(
            generation = self.generation,
            reindexed,
            timetables = self.timetables.len(),
            "committed snapshot"
        );
        self.last_snapshot = Arc::clone(&snapshot);
        snapshot
    }

    /// A timetable for `pattern` on `date` that no published snapshot can
    /// see. Callers must not hold an `Arc` of it, or `make_mut` copies again.
    fn writable(&mut self, pattern: &Arc<TripPattern>, date: NaiveDate) -> &mut Timetable {
        let key = TimetableKey::new(pattern.id(), date);
        if self.dirty.insert(key) {
            let copy = self.resolve(pattern, date).copy_for_date(date);
            self.timetables.insert(key, Arc::new(copy));
        }
        let timetable = self
            .timetables
            .entry(key)
            .or_insert_with(|| Arc::new(Timetable::new(Arc::clone(pattern)).copy_for_date(date)));
        Arc::make_mut(timetable)
    }
}
