//! The static transit network: stops, trips, patterns and their scheduled
//! timetables.
//!
//! Built once at load time and shared read-only (`Arc<TransitData>`) by the
//! snapshot machinery. Realtime updates never modify it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::{
    PatternId, ScheduleError, ServiceTime, Stop, StopPattern, Stops, Trip, TripId, TripPattern,
    TripSchedule,
};
use crate::timetable::{FrequencyEntry, FrequencyTimetable, Timetable};

/// Immutable static network data.
#[derive(Debug)]
pub struct TransitData {
    feed_id: String,
    stops: Stops,
    trips: HashMap<TripId, Arc<Trip>>,
    patterns: Vec<Arc<TripPattern>>,
    scheduled: Vec<Arc<Timetable>>,
    trip_patterns: HashMap<TripId, PatternId>,
    calendar: HashMap<NaiveDate, Arc<HashSet<String>>>,
}

impl TransitData {
    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    pub fn stops(&self) -> &Stops {
        &self.stops
    }

    pub fn trip(&self, id: &TripId) -> Option<&Arc<Trip>> {
        self.trips.get(id)
    }

    pub fn trip_count(&self) -> usize {
        self.trips.len()
    }

    pub fn pattern(&self, id: PatternId) -> Option<&Arc<TripPattern>> {
        self.patterns.get(id.index())
    }

    pub fn patterns(&self) -> &[Arc<TripPattern>] {
        &self.patterns
    }

    /// Number of static patterns. Realtime patterns are numbered after these.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// The scheduled pattern a static trip belongs to.
    pub fn pattern_for_trip(&self, trip: &TripId) -> Option<&Arc<TripPattern>> {
        self.trip_patterns.get(trip).and_then(|id| self.pattern(*id))
    }

    /// The scheduled timetable of a static pattern, valid for all dates.
    pub fn scheduled_timetable(&self, pattern: PatternId) -> Option<&Arc<Timetable>> {
        self.scheduled.get(pattern.index())
    }

    /// The scheduled row of a static trip.
    pub fn scheduled_trip(&self, trip: &TripId) -> Option<&Arc<TripSchedule>> {
        let pattern = self.trip_patterns.get(trip)?;
        self.scheduled_timetable(*pattern)?.trip_schedule(trip)
    }

    /// Service ids running on `date`, or `None` when no calendar was loaded
    /// and every service is assumed to run.
    pub fn services_on(&self, date: NaiveDate) -> Option<Arc<HashSet<String>>> {
        if self.calendar.is_empty() {
            return None;
        }
        Some(self.calendar.get(&date).cloned().unwrap_or_default())
    }

    /// Whether `trip` is scheduled to run on `date`.
    pub fn runs_on(&self, trip: &Trip, date: NaiveDate) -> bool {
        self.services_on(date)
            .is_none_or(|services| services.contains(&trip.service_id))
    }
}

/// Incremental builder grouping trips into patterns.
///
/// Trips with the same route and stop pattern share a [`TripPattern`].
/// Stops must be added before the trips that visit them so per-stop
/// wheelchair access is known.
#[derive(Debug)]
pub struct TransitDataBuilder {
    feed_id: String,
    stops: Stops,
    trips: HashMap<TripId, Arc<Trip>>,
    timetables: Vec<Timetable>,
    by_stop_pattern: HashMap<(String, StopPattern), PatternId>,
    trip_patterns: HashMap<TripId, PatternId>,
    calendar: HashMap<NaiveDate, HashSet<String>>,
}

impl TransitDataBuilder {
    pub fn new(feed_id: impl Into<String>) -> Self {
        Self {
            feed_id: feed_id.into(),
            stops: Stops::new(),
            trips: HashMap::new(),
            timetables: Vec::new(),
            by_stop_pattern: HashMap::new(),
            trip_patterns: HashMap::new(),
            calendar: HashMap::new(),
        }
    }

    pub fn add_stop(&mut self, stop: Stop) -> &mut Self {
        self.stops.insert(stop);
        self
    }

    pub fn stops(&self) -> &Stops {
        &self.stops
    }

    /// Mark `service_id` as running on `date`.
    pub fn add_service_date(&mut self, service_id: impl Into<String>, date: NaiveDate) -> &mut Self {
        self.calendar.entry(date).or_default().insert(service_id.into());
        self
    }

    fn pattern_for(&mut self, trip: &Arc<Trip>, stop_pattern: StopPattern) -> PatternId {
        let key = (trip.route_id.clone(), stop_pattern);
        if let Some(id) = self.by_stop_pattern.get(&key) {
            return *id;
        }
        let id = PatternId::new(self.timetables.len() as u32);
        let pattern = TripPattern::new(id, self.feed_id.clone(), &trip.route_id, key.1.clone(), &self.stops)
            .with_exemplar(Arc::clone(trip));
        self.timetables.push(Timetable::new(Arc::new(pattern)));
        self.by_stop_pattern.insert(key, id);
        id
    }

    /// Add an individually scheduled trip.
    pub fn add_trip(
        &mut self,
        trip: Trip,
        stop_pattern: StopPattern,
        arrivals: Vec<ServiceTime>,
        departures: Vec<ServiceTime>,
    ) -> Result<PatternId, ScheduleError> {
        if self.trips.contains_key(&trip.id) {
            return Err(ScheduleError::DuplicateTrip(trip.id));
        }
        if arrivals.len() != stop_pattern.len() {
            return Err(ScheduleError::LengthMismatch {
                expected: stop_pattern.len(),
                actual: arrivals.len(),
            });
        }
        let trip = Arc::new(trip);
        let schedule = TripSchedule::scheduled(Arc::clone(&trip), arrivals, departures)?;
        let id = self.pattern_for(&trip, stop_pattern);
        self.timetables[id.index()].add_trip(Arc::new(schedule));
        self.trip_patterns.insert(trip.id.clone(), id);
        self.trips.insert(trip.id.clone(), trip);
        Ok(id)
    }

    /// Add a headway-based trip: `arrivals`/`departures` are the template
    /// times, repeated over `entries`.
    pub fn add_frequency_trip(
        &mut self,
        trip: Trip,
        stop_pattern: StopPattern,
        arrivals: Vec<ServiceTime>,
        departures: Vec<ServiceTime>,
        entries: Vec<FrequencyEntry>,
    ) -> Result<PatternId, ScheduleError> {
        if self.trips.contains_key(&trip.id) {
            return Err(ScheduleError::DuplicateTrip(trip.id));
        }
        if arrivals.len() != stop_pattern.len() {
            return Err(ScheduleError::LengthMismatch {
                expected: stop_pattern.len(),
                actual: arrivals.len(),
            });
        }
        let trip = Arc::new(trip);
        let template = TripSchedule::scheduled(Arc::clone(&trip), arrivals, departures)?;
        let id = self.pattern_for(&trip, stop_pattern);
        self.timetables[id.index()]
            .add_frequency(FrequencyTimetable::new(Arc::new(template), entries));
        self.trips.insert(trip.id.clone(), trip);
        Ok(id)
    }

    /// Finish all scheduled timetables and freeze the network.
    pub fn build(self, index_threshold: usize) -> TransitData {
        let mut patterns = Vec::with_capacity(self.timetables.len());
        let mut scheduled = Vec::with_capacity(self.timetables.len());
        for mut timetable in self.timetables {
            timetable.finish(index_threshold);
            patterns.push(Arc::clone(timetable.pattern()));
            scheduled.push(Arc::new(timetable));
        }
        TransitData {
            feed_id: self.feed_id,
            stops: self.stops,
            trips: self.trips,
            patterns,
            scheduled,
            trip_patterns: self.trip_patterns,
            calendar: self
                .calendar
                .into_iter()
                .map(|(date, services)| (date, Arc::new(services)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StopId;

    fn t(s: i32) -> ServiceTime {
        ServiceTime::from_seconds(s)
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn abc() -> StopPattern {
        StopPattern::all_scheduled(vec!["A".into(), "B".into(), "C".into()]).unwrap()
    }

    fn builder() -> TransitDataBuilder {
        let mut b = TransitDataBuilder::new("F");
        for id in ["A", "B", "C"] {
            b.add_stop(Stop::new(StopId::new(id), id));
        }
        b
    }

    #[test]
    fn trips_with_same_stops_share_pattern() {
        let mut b = builder();
        let p1 = b
            .add_trip(Trip::new("T1".into(), "R", "S"), abc(), vec![t(0), t(60), t(120)], vec![t(0), t(60), t(120)])
            .unwrap();
        let p2 = b
            .add_trip(Trip::new("T2".into(), "R", "S"), abc(), vec![t(10), t(70), t(130)], vec![t(10), t(70), t(130)])
            .unwrap();
        let p3 = b
            .add_trip(Trip::new("T3".into(), "OTHER", "S"), abc(), vec![t(10), t(70), t(130)], vec![t(10), t(70), t(130)])
            .unwrap();
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);

        let data = b.build(16);
        assert_eq!(data.pattern_count(), 2);
        assert_eq!(data.scheduled_timetable(p1).unwrap().len(), 2);
        assert_eq!(data.pattern_for_trip(&"T2".into()).unwrap().id(), p1);
        assert_eq!(data.scheduled_trip(&"T3".into()).unwrap().departure(2), t(130));
        assert_eq!(data.pattern(p1).unwrap().exemplar().unwrap().id.as_str(), "T1");
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut b = builder();
        let err = b
            .add_trip(Trip::new("T".into(), "R", "S"), abc(), vec![t(0), t(60)], vec![t(0), t(60)])
            .unwrap_err();
        assert!(matches!(err, ScheduleError::LengthMismatch { expected: 3, actual: 2 }));
    }

    #[test]
    fn duplicate_trip_id_rejected() {
        let mut b = builder();
        let times = vec![t(0), t(60), t(120)];
        let p = b
            .add_trip(Trip::new("T".into(), "R", "S"), abc(), times.clone(), times.clone())
            .unwrap();
        let later = vec![t(600), t(660), t(720)];
        let err = b
            .add_trip(Trip::new("T".into(), "R", "S"), abc(), later.clone(), later.clone())
            .unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateTrip("T".into()));
        let err = b
            .add_frequency_trip(Trip::new("T".into(), "R", "S"), abc(), later.clone(), later, vec![])
            .unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateTrip("T".into()));

        let data = b.build(16);
        let tt = data.scheduled_timetable(p).unwrap();
        assert_eq!(tt.len(), 1);
        assert_eq!(tt.trip_schedule(&"T".into()).unwrap().departure(0), t(0));
    }

    #[test]
    fn calendar_restricts_services() {
        let mut b = builder();
        b.add_service_date("WEEKDAY", date(15));
        let data = b.build(16);
        let weekday = Trip::new("T".into(), "R", "WEEKDAY");
        assert!(data.runs_on(&weekday, date(15)));
        assert!(!data.runs_on(&weekday, date(16)));
    }

    #[test]
    fn empty_calendar_runs_everything() {
        let data = builder().build(16);
        assert!(data.services_on(date(1)).is_none());
        assert!(data.runs_on(&Trip::new("T".into(), "R", "ANY"), date(1)));
    }

    #[test]
    fn frequency_trip_attaches_to_pattern() {
        let mut b = builder();
        let p = b
            .add_frequency_trip(
                Trip::new("F1".into(), "R", "S"),
                abc(),
                vec![t(0), t(60), t(120)],
                vec![t(0), t(60), t(120)],
                vec![FrequencyEntry::new(t(0), t(3600), 600, true).unwrap()],
            )
            .unwrap();
        let data = b.build(16);
        let tt = data.scheduled_timetable(p).unwrap();
        assert_eq!(tt.frequencies().len(), 1);
        assert!(data.trip(&"F1".into()).is_some());
        assert!(data.pattern_for_trip(&"F1".into()).is_none());
    }
}
