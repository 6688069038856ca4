//! The per-pattern timetable and its search algorithms.
//!
//! Small timetables are searched linearly. Once the row count passes the
//! index threshold, [`Timetable::finish`] builds per-stop sorted indices and
//! searches binary-search the insertion point, then scan only as far as the
//! first row passing the filters. Both strategies return the same row:
//! boarding picks the lowest row among equal departures, alighting the
//! highest row among equal arrivals.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{SECONDS_PER_DAY, ServiceTime, TripId, TripPattern, TripSchedule};

use super::filter::TripFilter;
use super::frequency::FrequencyTimetable;
use super::index::TripIndex;

/// Row count above which sorted indices are built.
pub const DEFAULT_INDEX_THRESHOLD: usize = 16;

/// A trip found by a timetable search.
#[derive(Debug, Clone, PartialEq)]
pub struct TripMatch {
    /// Row of the trip in the timetable.
    pub row: usize,
    /// Departure (boarding) or arrival (alighting) time at the queried stop.
    pub time: ServiceTime,
    pub schedule: Arc<TripSchedule>,
}

/// A departure or arrival derived from a frequency timetable.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyMatch {
    pub time: ServiceTime,
    pub template: Arc<TripSchedule>,
}

/// The trips of one pattern, valid for one service date or for all dates.
#[derive(Debug, Clone)]
pub struct Timetable {
    pattern: Arc<TripPattern>,
    trips: Vec<Arc<TripSchedule>>,
    frequencies: Vec<FrequencyTimetable>,
    service_date: Option<NaiveDate>,
    index: Option<TripIndex>,
    best_running: Vec<i32>,
    best_dwell: Vec<i32>,
    min_departure: Option<ServiceTime>,
    max_arrival: Option<ServiceTime>,
}

impl Timetable {
    /// An empty scheduled timetable, valid for every service date.
    pub fn new(pattern: Arc<TripPattern>) -> Self {
        let n = pattern.num_stops();
        Self {
            pattern,
            trips: Vec::new(),
            frequencies: Vec::new(),
            service_date: None,
            index: None,
            best_running: vec![0; n.saturating_sub(1)],
            best_dwell: vec![0; n],
            min_departure: None,
            max_arrival: None,
        }
    }

    /// Copy for realtime edits on `date`.
    ///
    /// Rows are shared with `self`, not deep-copied. The copy has no index
    /// until [`Timetable::finish`] is called; searches on it scan linearly.
    pub fn copy_for_date(&self, date: NaiveDate) -> Self {
        Self {
            pattern: Arc::clone(&self.pattern),
            trips: self.trips.clone(),
            frequencies: self.frequencies.clone(),
            service_date: Some(date),
            index: None,
            best_running: self.best_running.clone(),
            best_dwell: self.best_dwell.clone(),
            min_departure: self.min_departure,
            max_arrival: self.max_arrival,
        }
    }

    pub(crate) fn add_trip(&mut self, schedule: Arc<TripSchedule>) {
        self.trips.push(schedule);
        self.index = None;
    }

    pub(crate) fn add_frequency(&mut self, frequency: FrequencyTimetable) {
        self.frequencies.push(frequency);
    }

    /// Replace the row at `row`. Out-of-range rows are ignored.
    pub(crate) fn set_trip(&mut self, row: usize, schedule: Arc<TripSchedule>) {
        if let Some(slot) = self.trips.get_mut(row) {
            *slot = schedule;
            self.index = None;
        }
    }

    /// Remove the row for `trip`, returning whether it was present.
    pub(crate) fn remove_trip(&mut self, trip: &TripId) -> bool {
        match self.trip_index(trip) {
            Some(row) => {
                self.trips.remove(row);
                self.index = None;
                true
            }
            None => false,
        }
    }

    /// Rebuild search indices and lower-bound caches.
    ///
    /// Indices are only built when the row count exceeds `index_threshold`;
    /// the threshold affects speed, never results.
    pub fn finish(&mut self, index_threshold: usize) {
        self.index = (self.trips.len() > index_threshold)
            .then(|| TripIndex::build(self.pattern.num_stops(), &self.trips));

        let n = self.pattern.num_stops();
        let mut best_running = vec![i32::MAX; n.saturating_sub(1)];
        let mut best_dwell = vec![i32::MAX; n];
        let templates = self.frequencies.iter().map(|f| f.template());
        for schedule in self.trips.iter().chain(templates) {
            for (stop, dwell) in best_dwell.iter_mut().enumerate() {
                *dwell = (*dwell).min(schedule.departure(stop) - schedule.arrival(stop));
            }
            for (hop, run) in best_running.iter_mut().enumerate() {
                *run = (*run).min(schedule.arrival(hop + 1) - schedule.departure(hop));
            }
        }
        for v in best_running.iter_mut().chain(best_dwell.iter_mut()) {
            if *v == i32::MAX {
                *v = 0;
            }
        }
        self.best_running = best_running;
        self.best_dwell = best_dwell;

        let last = n.saturating_sub(1);
        self.min_departure = self
            .trips
            .iter()
            .map(|s| s.departure(0))
            .chain(self.frequencies.iter().filter_map(|f| f.min_departure()))
            .min();
        self.max_arrival = self
            .trips
            .iter()
            .map(|s| s.arrival(last))
            .chain(self.frequencies.iter().filter_map(|f| f.max_arrival()))
            .max();
    }

    pub fn pattern(&self) -> &Arc<TripPattern> {
        &self.pattern
    }

    /// The date this realtime copy applies to; `None` for scheduled data.
    pub fn service_date(&self) -> Option<NaiveDate> {
        self.service_date
    }

    pub fn is_valid_for(&self, date: NaiveDate) -> bool {
        self.service_date.is_none_or(|d| d == date)
    }

    pub fn trips(&self) -> &[Arc<TripSchedule>] {
        &self.trips
    }

    pub fn frequencies(&self) -> &[FrequencyTimetable] {
        &self.frequencies
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty() && self.frequencies.is_empty()
    }

    pub fn is_indexed(&self) -> bool {
        self.index.is_some()
    }

    pub fn trip_index(&self, trip: &TripId) -> Option<usize> {
        self.trips.iter().position(|s| s.trip_id() == trip)
    }

    pub fn trip_schedule(&self, trip: &TripId) -> Option<&Arc<TripSchedule>> {
        self.trips.iter().find(|s| s.trip_id() == trip)
    }

    /// Minimum running time over `hop` (from stop `hop` to `hop + 1`).
    pub fn best_running_time(&self, hop: usize) -> i32 {
        self.best_running.get(hop).copied().unwrap_or(0)
    }

    /// Minimum dwell time at `stop`.
    pub fn best_dwell_time(&self, stop: usize) -> i32 {
        self.best_dwell.get(stop).copied().unwrap_or(0)
    }

    /// Earliest departure from the first stop, as of the last `finish`.
    pub fn min_departure(&self) -> Option<ServiceTime> {
        self.min_departure
    }

    /// Latest arrival at the last stop, as of the last `finish`.
    pub fn max_arrival(&self) -> Option<ServiceTime> {
        self.max_arrival
    }

    /// Whether trips of this timetable span more than one day, so that
    /// trips of adjacent service days may overlap.
    pub fn trips_overlap(&self) -> bool {
        match (self.min_departure, self.max_arrival) {
            (Some(min), Some(max)) => max - min > SECONDS_PER_DAY,
            _ => false,
        }
    }

    /// Whether any trip arrives after midnight of its service day.
    pub fn crosses_midnight(&self) -> bool {
        self.max_arrival
            .is_some_and(|t| t.seconds() > SECONDS_PER_DAY)
    }

    /// Sorted departures of running trips at `stop`.
    pub fn departure_times(&self, stop: usize) -> Vec<ServiceTime> {
        let mut times: Vec<ServiceTime> = self
            .trips
            .iter()
            .filter(|s| !s.is_canceled())
            .map(|s| s.departure(stop))
            .collect();
        times.sort_unstable();
        times
    }

    fn stop_allows_boarding(&self, stop: usize, filter: &TripFilter) -> bool {
        stop < self.pattern.num_stops()
            && self.pattern.can_board(stop)
            && (!filter.requires_wheelchair() || self.pattern.wheelchair_accessible(stop))
    }

    fn stop_allows_alighting(&self, stop: usize, filter: &TripFilter) -> bool {
        stop < self.pattern.num_stops()
            && self.pattern.can_alight(stop)
            && (!filter.requires_wheelchair() || self.pattern.wheelchair_accessible(stop))
    }

    fn boardable(&self, row: usize, stop: usize, filter: &TripFilter) -> bool {
        let s = &self.trips[row];
        s.can_board_at(stop) && filter.accepts(s)
    }

    fn alightable(&self, row: usize, stop: usize, filter: &TripFilter) -> bool {
        let s = &self.trips[row];
        s.can_alight_at(stop) && filter.accepts(s)
    }

    fn boarding_match(&self, row: usize, stop: usize) -> TripMatch {
        TripMatch {
            row,
            time: self.trips[row].departure(stop),
            schedule: Arc::clone(&self.trips[row]),
        }
    }

    fn alighting_match(&self, row: usize, stop: usize) -> TripMatch {
        TripMatch {
            row,
            time: self.trips[row].arrival(stop),
            schedule: Arc::clone(&self.trips[row]),
        }
    }

    /// The trip with the earliest departure from `stop` at or after
    /// `after` that passes `filter`.
    ///
    /// Times are relative to this timetable's service day; callers query
    /// adjacent days themselves for trips crossing midnight.
    pub fn boarding_trip(
        &self,
        stop: usize,
        after: ServiceTime,
        filter: &TripFilter,
    ) -> Option<TripMatch> {
        if !self.stop_allows_boarding(stop, filter) {
            return None;
        }
        let row = match &self.index {
            Some(index) => self.board_indexed(index, stop, after, filter)?.0,
            None => self.board_linear(stop, after, filter)?,
        };
        Some(self.boarding_match(row, stop))
    }

    /// The trip with the latest arrival at `stop` at or before `before`
    /// that passes `filter`.
    pub fn alighting_trip(
        &self,
        stop: usize,
        before: ServiceTime,
        filter: &TripFilter,
    ) -> Option<TripMatch> {
        if !self.stop_allows_alighting(stop, filter) {
            return None;
        }
        let row = match &self.index {
            Some(index) => self.alight_indexed(index, stop, before, filter)?,
            None => self.alight_linear(stop, before, filter)?,
        };
        Some(self.alighting_match(row, stop))
    }

    /// Like [`Timetable::boarding_trip`], also returning up to `k` further
    /// usable trips that follow the best match in search order.
    ///
    /// The extra trips are neighbours by position, not necessarily the next
    /// departures in time.
    pub fn boarding_trip_with_adjacent(
        &self,
        stop: usize,
        after: ServiceTime,
        filter: &TripFilter,
        k: usize,
    ) -> Option<(TripMatch, Vec<TripMatch>)> {
        if !self.stop_allows_boarding(stop, filter) {
            return None;
        }
        let (best, following): (usize, Vec<usize>) = match &self.index {
            Some(index) => {
                let (row, pos) = self.board_indexed(index, stop, after, filter)?;
                let following = index.departures_at(stop)[pos + 1..]
                    .iter()
                    .map(|&r| r as usize)
                    .filter(|&r| self.boardable(r, stop, filter))
                    .take(k)
                    .collect();
                (row, following)
            }
            None => {
                let row = self.board_linear(stop, after, filter)?;
                let following = (row + 1..self.trips.len())
                    .filter(|&r| {
                        self.trips[r].departure(stop) >= after && self.boardable(r, stop, filter)
                    })
                    .take(k)
                    .collect();
                (row, following)
            }
        };
        let adjacent = following
            .into_iter()
            .map(|r| self.boarding_match(r, stop))
            .collect();
        Some((self.boarding_match(best, stop), adjacent))
    }

    pub(crate) fn board_linear(
        &self,
        stop: usize,
        after: ServiceTime,
        filter: &TripFilter,
    ) -> Option<usize> {
        let mut best: Option<(usize, ServiceTime)> = None;
        for (row, schedule) in self.trips.iter().enumerate() {
            let dep = schedule.departure(stop);
            if dep < after || !self.boardable(row, stop, filter) {
                continue;
            }
            if best.is_none_or(|(_, best_dep)| dep < best_dep) {
                best = Some((row, dep));
            }
        }
        best.map(|(row, _)| row)
    }

    /// Returns the row and its position in the stop's sorted index.
    pub(crate) fn board_indexed(
        &self,
        index: &TripIndex,
        stop: usize,
        after: ServiceTime,
        filter: &TripFilter,
    ) -> Option<(usize, usize)> {
        let order = index.departures_at(stop);
        let start = order.partition_point(|&r| self.trips[r as usize].departure(stop) < after);
        order[start..]
            .iter()
            .enumerate()
            .map(|(offset, &r)| (r as usize, start + offset))
            .find(|&(r, _)| self.boardable(r, stop, filter))
    }

    pub(crate) fn alight_linear(
        &self,
        stop: usize,
        before: ServiceTime,
        filter: &TripFilter,
    ) -> Option<usize> {
        let mut best: Option<(usize, ServiceTime)> = None;
        for (row, schedule) in self.trips.iter().enumerate() {
            let arr = schedule.arrival(stop);
            if arr > before || !self.alightable(row, stop, filter) {
                continue;
            }
            if best.is_none_or(|(_, best_arr)| arr >= best_arr) {
                best = Some((row, arr));
            }
        }
        best.map(|(row, _)| row)
    }

    pub(crate) fn alight_indexed(
        &self,
        index: &TripIndex,
        stop: usize,
        before: ServiceTime,
        filter: &TripFilter,
    ) -> Option<usize> {
        let order = index.arrivals_at(stop);
        let end = order.partition_point(|&r| self.trips[r as usize].arrival(stop) <= before);
        order[..end]
            .iter()
            .rev()
            .map(|&r| r as usize)
            .find(|&r| self.alightable(r, stop, filter))
    }

    pub(crate) fn index(&self) -> Option<&TripIndex> {
        self.index.as_ref()
    }

    /// Earliest headway-based departure from `stop` after `after`.
    pub fn next_frequency_departure(
        &self,
        stop: usize,
        after: ServiceTime,
        filter: &TripFilter,
    ) -> Option<FrequencyMatch> {
        if !self.stop_allows_boarding(stop, filter) {
            return None;
        }
        self.frequencies
            .iter()
            .filter(|f| f.template().can_board_at(stop) && filter.accepts(f.template()))
            .filter_map(|f| {
                f.next_departure(stop, after).map(|time| FrequencyMatch {
                    time,
                    template: Arc::clone(f.template()),
                })
            })
            .min_by_key(|m| m.time)
    }

    /// Latest headway-based arrival at `stop` before `before`.
    pub fn previous_frequency_arrival(
        &self,
        stop: usize,
        before: ServiceTime,
        filter: &TripFilter,
    ) -> Option<FrequencyMatch> {
        if !self.stop_allows_alighting(stop, filter) {
            return None;
        }
        self.frequencies
            .iter()
            .filter(|f| f.template().can_alight_at(stop) && filter.accepts(f.template()))
            .filter_map(|f| {
                f.previous_arrival(stop, before).map(|time| FrequencyMatch {
                    time,
                    template: Arc::clone(f.template()),
                })
            })
            .max_by_key(|m| m.time)
    }
}
