//! Immutable, published views of all timetables.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{PatternId, ServiceDay, ServiceTime, TripId, TripPattern};
use crate::network::TransitData;
use crate::timetable::{Timetable, TripFilter, TripMatch};

/// Identifies a realtime timetable: one pattern on one service date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimetableKey {
    pub pattern: PatternId,
    pub service_date: NaiveDate,
}

impl TimetableKey {
    pub fn new(pattern: PatternId, service_date: NaiveDate) -> Self {
        Self {
            pattern,
            service_date,
        }
    }
}

impl fmt::Display for TimetableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.pattern, self.service_date)
    }
}

/// A boarding found by [`Snapshot::board_across_service_days`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDayMatch {
    /// Service day the trip belongs to.
    pub service_date: NaiveDate,
    /// Departure time relative to the queried service day.
    pub time: ServiceTime,
    pub trip: TripMatch,
}

/// A point-in-time view of every timetable.
///
/// Never modified after publication. Readers take one snapshot at the start
/// of a search and use it throughout.
#[derive(Debug)]
pub struct Snapshot {
    network: Arc<TransitData>,
    timetables: HashMap<TimetableKey, Arc<Timetable>>,
    added_patterns: HashMap<(TripId, NaiveDate), Arc<TripPattern>>,
    generation: u64,
}

impl Snapshot {
    /// A snapshot with no realtime data.
    pub fn empty(network: Arc<TransitData>) -> Self {
        Self::new(network, HashMap::new(), HashMap::new(), 0)
    }

    pub(crate) fn new(
        network: Arc<TransitData>,
        timetables: HashMap<TimetableKey, Arc<Timetable>>,
        added_patterns: HashMap<(TripId, NaiveDate), Arc<TripPattern>>,
        generation: u64,
    ) -> Self {
        Self {
            network,
            timetables,
            added_patterns,
            generation,
        }
    }

    pub fn network(&self) -> &Arc<TransitData> {
        &self.network
    }

    /// Commit counter; the empty snapshot is generation 0.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The timetable for `pattern` on `date`.
    ///
    /// Falls back to the scheduled timetable, or to an empty one for a
    /// realtime pattern with no trips on that date.
    pub fn resolve(&self, pattern: &Arc<TripPattern>, date: NaiveDate) -> Arc<Timetable> {
        resolve_in(&self.network, &self.timetables, pattern, date)
    }

    /// The static timetable of `pattern`, ignoring realtime data.
    pub fn scheduled(&self, pattern: PatternId) -> Option<&Arc<Timetable>> {
        self.network.scheduled_timetable(pattern)
    }

    /// The realtime timetable for `key`, if realtime data exists for it.
    pub fn realtime_timetable(&self, key: &TimetableKey) -> Option<&Arc<Timetable>> {
        self.timetables.get(key)
    }

    pub fn realtime_timetable_count(&self) -> usize {
        self.timetables.len()
    }

    pub fn has_realtime_data(&self) -> bool {
        !self.timetables.is_empty()
    }

    /// The realtime pattern a trip runs on for `date`, when realtime data
    /// moved it off its scheduled pattern or added it.
    pub fn new_pattern_for_modified_trip(
        &self,
        trip: &TripId,
        date: NaiveDate,
    ) -> Option<&Arc<TripPattern>> {
        self.added_patterns.get(&(trip.clone(), date))
    }

    /// Earliest boarding at `stop` of `pattern` at or after `time` on `day`,
    /// considering trips of the previous and next service days as well.
    ///
    /// Yesterday's trips are queried with `time` shifted forward by a day
    /// and tomorrow's shifted back. Each day's calendar is applied to the
    /// filter when the network has one.
    pub fn board_across_service_days(
        &self,
        pattern: &Arc<TripPattern>,
        stop: usize,
        day: ServiceDay,
        time: ServiceTime,
        filter: &TripFilter,
    ) -> Option<ServiceDayMatch> {
        type Shift = fn(ServiceTime) -> ServiceTime;
        // (day, query time on that day, found time back on `day`)
        let candidates: [(Option<ServiceDay>, Shift, Shift); 3] = [
            (day.previous(), ServiceTime::on_previous_day, ServiceTime::on_next_day),
            (Some(day), |t| t, |t| t),
            (day.next(), ServiceTime::on_next_day, ServiceTime::on_previous_day),
        ];
        candidates
            .into_iter()
            .filter_map(|(service_day, to_day, back)| {
                let date = service_day?.date();
                let timetable = self.resolve(pattern, date);
                let day_filter = match self.network.services_on(date) {
                    Some(services) => filter.clone().with_active_services(services),
                    None => filter.clone(),
                };
                let found = timetable.boarding_trip(stop, to_day(time), &day_filter)?;
                Some(ServiceDayMatch {
                    service_date: date,
                    time: back(found.time),
                    trip: found,
                })
            })
            .min_by_key(|m| m.time)
    }
}

pub(crate) fn resolve_in(
    network: &TransitData,
    timetables: &HashMap<TimetableKey, Arc<Timetable>>,
    pattern: &Arc<TripPattern>,
    date: NaiveDate,
) -> Arc<Timetable> {
    if let Some(timetable) = timetables.get(&TimetableKey::new(pattern.id(), date)) {
        return Arc::clone(timetable);
    }
    match network.scheduled_timetable(pattern.id()) {
        Some(timetable) if !pattern.is_created_by_realtime() => Arc::clone(timetable),
        _ => Arc::new(Timetable::new(Arc::clone(pattern))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Stop, StopId, StopPattern, Trip};
    use crate::network::TransitDataBuilder;

    fn t(s: i32) -> ServiceTime {
        ServiceTime::from_seconds(s)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    /// Two trips, one late in the evening that runs past midnight.
    fn network(with_calendar: bool) -> Arc<TransitData> {
        let mut b = TransitDataBuilder::new("F");
        for id in ["A", "B"] {
            b.add_stop(Stop::new(StopId::new(id), id));
        }
        let ab = || StopPattern::all_scheduled(vec!["A".into(), "B".into()]).unwrap();
        let times = |d: i32| vec![t(d), t(d + 600)];
        b.add_trip(Trip::new("MORNING".into(), "R", "DAILY"), ab(), times(8 * 3600), times(8 * 3600))
            .unwrap();
        b.add_trip(
            Trip::new("LATE".into(), "R", "FRIDAY"),
            ab(),
            times(24 * 3600 + 1800),
            times(24 * 3600 + 1800),
        )
        .unwrap();
        if with_calendar {
            for d in 14..=17 {
                b.add_service_date("DAILY", date(d));
            }
            b.add_service_date("FRIDAY", date(15));
        }
        Arc::new(b.build(16))
    }

    #[test]
    fn resolve_falls_back_to_scheduled() {
        let net = network(false);
        let snapshot = Snapshot::empty(Arc::clone(&net));
        let pattern = Arc::clone(&net.patterns()[0]);
        let resolved = snapshot.resolve(&pattern, date(15));
        assert!(Arc::ptr_eq(&resolved, net.scheduled_timetable(pattern.id()).unwrap()));
        assert_eq!(snapshot.generation(), 0);
        assert!(!snapshot.has_realtime_data());
    }

    #[test]
    fn resolve_realtime_pattern_without_data_is_empty() {
        let net = network(false);
        let snapshot = Snapshot::empty(Arc::clone(&net));
        let pattern = Arc::new(TripPattern::realtime(
            PatternId::new(0),
            "F",
            "R",
            net.patterns()[0].stop_pattern().clone(),
            None,
            net.stops(),
        ));
        assert!(snapshot.resolve(&pattern, date(15)).is_empty());
    }

    #[test]
    fn boarding_after_midnight_finds_previous_days_trip() {
        let net = network(true);
        let snapshot = Snapshot::empty(Arc::clone(&net));
        let pattern = Arc::clone(&net.patterns()[0]);
        // 00:10 on Saturday 16th: Friday's late trip leaves at 00:30.
        let m = snapshot
            .board_across_service_days(
                &pattern,
                0,
                ServiceDay::new(date(16)),
                t(600),
                &TripFilter::new(),
            )
            .unwrap();
        assert_eq!(m.service_date, date(15));
        assert_eq!(m.time, t(1800));
        assert_eq!(m.trip.schedule.trip_id().as_str(), "LATE");
    }

    #[test]
    fn calendar_excludes_inactive_days() {
        let net = network(true);
        let snapshot = Snapshot::empty(Arc::clone(&net));
        let pattern = Arc::clone(&net.patterns()[0]);
        // Sunday 17th 00:10: the late trip only runs on Friday's service day.
        let m = snapshot
            .board_across_service_days(
                &pattern,
                0,
                ServiceDay::new(date(17)),
                t(600),
                &TripFilter::new(),
            )
            .unwrap();
        assert_eq!(m.service_date, date(17));
        assert_eq!(m.trip.schedule.trip_id().as_str(), "MORNING");
        assert_eq!(m.time, t(8 * 3600));
    }

    #[test]
    fn late_evening_boarding_uses_next_day() {
        let net = network(false);
        let snapshot = Snapshot::empty(Arc::clone(&net));
        let pattern = Arc::clone(&net.patterns()[0]);
        // 23:00 with no calendar: the next departure is tomorrow-relative
        // 00:30 via today's late trip at 24:30.
        let m = snapshot
            .board_across_service_days(
                &pattern,
                0,
                ServiceDay::new(date(15)),
                t(23 * 3600),
                &TripFilter::new(),
            )
            .unwrap();
        assert_eq!(m.time, t(24 * 3600 + 1800));
        assert_eq!(m.service_date, date(15));
    }

    #[test]
    fn key_display() {
        let key = TimetableKey::new(PatternId::new(3), date(15));
        assert_eq!(key.to_string(), "P3@2024-03-15");
    }
}
