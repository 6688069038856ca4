//! Headway-based service.
//!
//! A frequency timetable describes trips that are not individually
//! scheduled: one template trip gives the running times between stops, and
//! a list of [`FrequencyEntry`] ranges says how often the template repeats.
//! Departures are derived algebraically instead of being stored.
//!
//! Range times refer to departures from the first stop. A query at stop
//! `s` is first shifted by the template's offset at `s`, answered against
//! the range, then shifted back.

use std::sync::Arc;

use crate::domain::{ScheduleError, ServiceTime, TripSchedule};

/// One repeating range: a departure every `headway` seconds within
/// `[start, end)`.
///
/// When `exact` is set the departures lie on the grid
/// `start + k * headway`; otherwise the headway is only an upper bound on
/// the wait and any time is reachable after waiting one headway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyEntry {
    start: ServiceTime,
    end: ServiceTime,
    headway: i32,
    exact: bool,
}

impl FrequencyEntry {
    pub fn new(
        start: ServiceTime,
        end: ServiceTime,
        headway: i32,
        exact: bool,
    ) -> Result<Self, ScheduleError> {
        if headway <= 0 {
            return Err(ScheduleError::InvalidFrequency("headway must be positive"));
        }
        if end <= start {
            return Err(ScheduleError::InvalidFrequency("range must end after it starts"));
        }
        Ok(Self {
            start,
            end,
            headway,
            exact,
        })
    }

    pub fn start(&self) -> ServiceTime {
        self.start
    }

    pub fn end(&self) -> ServiceTime {
        self.end
    }

    pub fn headway(&self) -> i32 {
        self.headway
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// First-stop departure following `after`.
    ///
    /// Exact ranges snap to the grid point strictly after `after`, so a
    /// query landing on a departure advances to the next one. Queries
    /// before the range start get the first departure.
    pub fn next_departure(&self, after: i32) -> Option<i32> {
        let (start, end, h) = (self.start.seconds(), self.end.seconds(), self.headway);
        let t = if self.exact {
            if after < start {
                start
            } else {
                start + ((after - start) / h + 1) * h
            }
        } else {
            after.max(start) + h
        };
        (t < end).then_some(t)
    }

    /// First-stop departure preceding `before`: the time-reversed
    /// counterpart of [`FrequencyEntry::next_departure`], anchored at the
    /// end of the range.
    ///
    /// Exact ranges snap to the grid point strictly before `before`;
    /// queries after the last departure get the last departure.
    pub fn previous_departure(&self, before: i32) -> Option<i32> {
        let (start, end, h) = (self.start.seconds(), self.end.seconds(), self.headway);
        let t = if self.exact {
            let last = start + ((end - start - 1) / h) * h;
            if before > last {
                last
            } else if before > start {
                start + ((before - start - 1) / h) * h
            } else {
                return None;
            }
        } else {
            before.min(end) - h
        };
        (t >= start && t < end).then_some(t)
    }
}

/// A template trip repeated over one or more frequency ranges.
#[derive(Debug, Clone)]
pub struct FrequencyTimetable {
    template: Arc<TripSchedule>,
    entries: Vec<FrequencyEntry>,
}

impl FrequencyTimetable {
    /// Build from a template and its ranges. Ranges are sorted by start.
    pub fn new(template: Arc<TripSchedule>, mut entries: Vec<FrequencyEntry>) -> Self {
        entries.sort_by_key(|e| e.start);
        Self { template, entries }
    }

    pub fn template(&self) -> &Arc<TripSchedule> {
        &self.template
    }

    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    fn origin(&self) -> ServiceTime {
        self.template.departure(0)
    }

    /// Departure offset of `stop` relative to the first-stop departure.
    pub fn departure_offset(&self, stop: usize) -> i32 {
        self.template.departure(stop) - self.origin()
    }

    /// Arrival offset of `stop` relative to the first-stop departure.
    pub fn arrival_offset(&self, stop: usize) -> i32 {
        self.template.arrival(stop) - self.origin()
    }

    /// Earliest departure from `stop` following `after` over all ranges.
    pub fn next_departure(&self, stop: usize, after: ServiceTime) -> Option<ServiceTime> {
        let offset = self.departure_offset(stop);
        self.entries
            .iter()
            .filter_map(|e| e.next_departure(after.seconds() - offset))
            .min()
            .map(|t| ServiceTime::from_seconds(t + offset))
    }

    /// Latest arrival at `stop` preceding `before` over all ranges.
    pub fn previous_arrival(&self, stop: usize, before: ServiceTime) -> Option<ServiceTime> {
        let offset = self.arrival_offset(stop);
        self.entries
            .iter()
            .filter_map(|e| e.previous_departure(before.seconds() - offset))
            .max()
            .map(|t| ServiceTime::from_seconds(t + offset))
    }

    /// Earliest first-stop departure over all ranges.
    pub fn min_departure(&self) -> Option<ServiceTime> {
        self.entries.first().map(|e| e.start)
    }

    /// Latest arrival at the final stop over all ranges.
    pub fn max_arrival(&self) -> Option<ServiceTime> {
        let last = self.template.num_stops().checked_sub(1)?;
        let offset = self.arrival_offset(last);
        self.entries
            .iter()
            .filter_map(|e| e.previous_departure(e.end.seconds()))
            .max()
            .map(|t| ServiceTime::from_seconds(t + offset))
    }
}
