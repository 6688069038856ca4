//! The shared entry point for realtime writers and searching readers.
//!
//! Writers serialize on one mutex around the [`TimetableBuffer`]. The last
//! published [`Snapshot`] sits behind an [`ArcSwap`]: readers load it
//! without locking and commits swap the pointer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwap;
use chrono::{Days, Local, NaiveDate};
use tracing::{debug, info, trace};

use crate::config::UpdaterConfig;
use crate::domain::{RealTimeState, TripId, TripPattern};
use crate::network::TransitData;
use crate::realtime::{
    JourneyUpdate, TripMatcher, UpdateApplier, UpdateError, UpdateResult, build_added_trip,
};

use super::buffer::TimetableBuffer;
use super::pattern_cache::{PatternKey, RealtimePatternCache};
use super::snapshot::Snapshot;

/// Realtime data older than this many days before today is dropped.
const PURGE_AFTER_DAYS: u64 = 2;

struct Writer {
    buffer: TimetableBuffer,
    last_commit: Option<Instant>,
    last_purge: Option<NaiveDate>,
}

/// Owns the buffer and publishes snapshots of it.
pub struct SnapshotSource {
    network: Arc<TransitData>,
    config: UpdaterConfig,
    writer: Mutex<Writer>,
    published: ArcSwap<Snapshot>,
    patterns: RealtimePatternCache,
    matcher: Option<Box<dyn TripMatcher>>,
}

impl SnapshotSource {
    pub fn new(network: Arc<TransitData>, config: UpdaterConfig) -> Self {
        let buffer = TimetableBuffer::new(Arc::clone(&network), config.index_threshold);
        let published = ArcSwap::new(Arc::clone(buffer.last_snapshot()));
        let first_pattern_id = u32::try_from(network.pattern_count()).unwrap_or(u32::MAX);
        Self {
            patterns: RealtimePatternCache::new(first_pattern_id, config.pattern_cache_capacity),
            network,
            config,
            writer: Mutex::new(Writer {
                buffer,
                last_commit: None,
                last_purge: None,
            }),
            published,
            matcher: None,
        }
    }

    /// Resolve updates without a trip id through `matcher`.
    pub fn with_matcher(mut self, matcher: Box<dyn TripMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    pub fn network(&self) -> &Arc<TransitData> {
        &self.network
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.published.load_full()
    }

    /// Commit pending changes unless the last commit was too recent.
    pub fn commit(&self, force: bool) -> Arc<Snapshot> {
        self.commit_at(force, Instant::now())
    }

    /// [`SnapshotSource::commit`] with an explicit clock reading.
    pub fn commit_at(&self, force: bool, now: Instant) -> Arc<Snapshot> {
        let mut writer = self.lock_writer();
        self.commit_locked(&mut writer, force, now)
    }

    /// Apply a batch of updates from `feed_id`, then commit if due.
    ///
    /// With `full_dataset` all earlier realtime data of the feed is dropped
    /// first. Rejected updates are counted and logged; they leave the
    /// buffer unchanged for their trip.
    pub fn apply_updates(
        &self,
        feed_id: &str,
        full_dataset: bool,
        updates: &[JourneyUpdate],
    ) -> UpdateResult {
        self.apply_updates_at(
            feed_id,
            full_dataset,
            updates,
            Instant::now(),
            Local::now().date_naive(),
        )
    }

    /// [`SnapshotSource::apply_updates`] with explicit clock readings.
    pub fn apply_updates_at(
        &self,
        feed_id: &str,
        full_dataset: bool,
        updates: &[JourneyUpdate],
        now: Instant,
        today: NaiveDate,
    ) -> UpdateResult {
        let mut writer = self.lock_writer();
        if full_dataset {
            writer.buffer.clear(feed_id);
        }

        let mut result = UpdateResult::new();
        for update in updates {
            let outcome = self.apply_one(&mut writer.buffer, feed_id, update);
            if let Err(e) = &outcome {
                debug!(
                    feed = feed_id,
                    trip = ?update.trip_id,
                    date = %update.service_date,
                    error = %e,
                    "rejected realtime update"
                );
            }
            result.record(&outcome);
        }
        info!(feed = feed_id, %result, "realtime updates applied");

        let purged = self.config.purge_expired_data && purge_if_due(&mut writer, today);
        self.commit_locked(&mut writer, purged, now);
        result
    }

    fn lock_writer(&self) -> MutexGuard<'_, Writer> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit_locked(&self, writer: &mut Writer, force: bool, now: Instant) -> Arc<Snapshot> {
        if !force {
            if let Some(last) = writer.last_commit {
                if now.saturating_duration_since(last) < self.config.max_snapshot_frequency() {
                    trace!("commit throttled");
                    return self.snapshot();
                }
            }
        }

        let snapshot = writer.buffer.commit(force);
        if !Arc::ptr_eq(&self.published.load_full(), &snapshot) {
            self.published.store(Arc::clone(&snapshot));
            writer.last_commit = Some(now);
        }
        snapshot
    }

    fn apply_one(
        &self,
        buffer: &mut TimetableBuffer,
        feed_id: &str,
        update: &JourneyUpdate,
    ) -> Result<(), UpdateError> {
        let trip_id = match &update.trip_id {
            Some(id) => id.clone(),
            None => self
                .matcher
                .as_ref()
                .and_then(|m| m.match_trip(update, &self.network))
                .ok_or(UpdateError::NoFuzzyMatch)?,
        };

        if let Some(pattern) = self.network.pattern_for_trip(&trip_id) {
            return self.apply_scheduled(buffer, Arc::clone(pattern), &trip_id, update);
        }
        if self.network.trip(&trip_id).is_some() {
            // Frequency-based trips have no row of their own to update.
            return Err(UpdateError::TripNotFoundInPattern(trip_id));
        }
        match buffer.added_pattern(&trip_id, update.service_date).cloned() {
            Some(pattern) if !update.extra_journey || update.calls.is_empty() => {
                self.apply_to_added(buffer, &pattern, &trip_id, update)
            }
            _ if update.extra_journey => self.apply_added(buffer, feed_id, &trip_id, update),
            _ => Err(UpdateError::UnknownTrip(trip_id)),
        }
    }

    /// Update a trip of the static network.
    fn apply_scheduled(
        &self,
        buffer: &mut TimetableBuffer,
        pattern: Arc<TripPattern>,
        trip_id: &TripId,
        update: &JourneyUpdate,
    ) -> Result<(), UpdateError> {
        let date = update.service_date;
        if let Some(trip) = self.network.trip(trip_id) {
            if !self.network.runs_on(trip, date) {
                return Err(UpdateError::NoServiceForDate {
                    trip: trip_id.clone(),
                    date,
                });
            }
        }

        let original = buffer
            .resolve(&pattern, date)
            .trip_schedule(trip_id)
            .cloned()
            .ok_or_else(|| UpdateError::TripNotFoundInPattern(trip_id.clone()))?;
        let moved = buffer.added_pattern(trip_id, date).cloned();
        let current = moved
            .as_ref()
            .and_then(|p| buffer.resolve(p, date).trip_schedule(trip_id).cloned())
            .unwrap_or_else(|| Arc::clone(&original));

        let applied =
            UpdateApplier::new(self.network.stops()).apply(&pattern, &current, update)?;

        let Some(stops) = applied.modified_stops else {
            if moved.is_some() {
                buffer.revert_trip_to_scheduled_pattern(trip_id, date);
            }
            return buffer.update(&pattern, applied.schedule, date);
        };

        let stop_pattern = pattern
            .stop_pattern()
            .with_stops(stops)
            .map_err(|_| UpdateError::InvalidCallStructure("modified stop pattern rejected"))?;
        let realtime_pattern = self.patterns.get_or_create(
            PatternKey {
                original: Some(pattern.id()),
                route_id: pattern.route_id().to_string(),
                stop_pattern,
            },
            pattern.feed_id(),
            pattern.exemplar(),
            self.network.stops(),
        );
        if moved.is_some_and(|p| p.id() != realtime_pattern.id()) {
            buffer.revert_trip_to_scheduled_pattern(trip_id, date);
        }
        buffer.update(&realtime_pattern, applied.schedule, date)?;
        buffer.update(&pattern, original.cancelled(), date)?;
        buffer.set_added_pattern(trip_id.clone(), date, realtime_pattern);
        Ok(())
    }

    /// Install a trip the static network does not know.
    fn apply_added(
        &self,
        buffer: &mut TimetableBuffer,
        feed_id: &str,
        trip_id: &TripId,
        update: &JourneyUpdate,
    ) -> Result<(), UpdateError> {
        let date = update.service_date;
        let added = build_added_trip(update, self.network.stops())?;
        let pattern = self.patterns.get_or_create(
            PatternKey {
                original: None,
                route_id: added.trip.route_id.clone(),
                stop_pattern: added.stop_pattern,
            },
            feed_id,
            Some(&added.trip),
            self.network.stops(),
        );
        let previous = buffer.added_pattern(trip_id, date).map(|p| p.id());
        if previous.is_some_and(|id| id != pattern.id()) {
            buffer.revert_trip_to_scheduled_pattern(trip_id, date);
        }
        let schedule = if update.cancelled {
            added.schedule.cancelled()
        } else {
            added.schedule
        };
        buffer.update(&pattern, schedule, date)?;
        buffer.set_added_pattern(trip_id.clone(), date, pattern);
        Ok(())
    }

    /// Update a previously added trip with a message that does not restate
    /// its stops, such as a cancellation.
    fn apply_to_added(
        &self,
        buffer: &mut TimetableBuffer,
        pattern: &Arc<TripPattern>,
        trip_id: &TripId,
        update: &JourneyUpdate,
    ) -> Result<(), UpdateError> {
        let date = update.service_date;
        let current = buffer
            .resolve(pattern, date)
            .trip_schedule(trip_id)
            .cloned()
            .ok_or_else(|| UpdateError::TripNotFoundInPattern(trip_id.clone()))?;
        let applied = UpdateApplier::new(self.network.stops()).apply(pattern, &current, update)?;
        if applied.modified_stops.is_some() {
            return Err(UpdateError::InvalidCallStructure(
                "added trip moved to another platform",
            ));
        }
        let schedule = match applied.schedule.state() {
            RealTimeState::Canceled => applied.schedule,
            _ => applied.schedule.with_state(RealTimeState::Added),
        };
        buffer.update(pattern, schedule, date)
    }
}

/// Purge data older than today minus [`PURGE_AFTER_DAYS`], at most once per
/// day. Returns whether anything was removed.
fn purge_if_due(writer: &mut Writer, today: NaiveDate) -> bool {
    if writer.last_purge == Some(today) {
        return false;
    }
    writer.last_purge = Some(today);
    let Some(cutoff) = today.checked_sub_days(Days::new(PURGE_AFTER_DAYS)) else {
        return false;
    };
    writer.buffer.purge_expired_data(cutoff)
}

impl std::fmt::Debug for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotSource")
            .field("config", &self.config)
            .field("generation", &self.snapshot().generation())
            .field("patterns", &self.patterns)
            .field("has_matcher", &self.matcher.is_some())
            .finish()
    }
}
