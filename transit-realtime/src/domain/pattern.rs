//! Trip patterns: the stop sequence shared by a group of trips.

use std::fmt;
use std::sync::Arc;

use super::error::ScheduleError;
use super::stop::{StopId, Stops};
use super::trip::Trip;

/// Dense identifier of a trip pattern.
///
/// Static patterns are numbered from zero in load order; patterns created
/// by realtime updates continue the sequence.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatternId(u32);

impl PatternId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn as_u32(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PatternId({})", self.0)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Pickup or dropoff permission at a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PickDrop {
    #[default]
    Scheduled,
    None,
    CallAgency,
    CoordinateWithDriver,
}

impl PickDrop {
    /// Map a GTFS `pickup_type`/`drop_off_type` code. Unknown codes are
    /// treated as regularly scheduled.
    pub fn from_gtfs(code: u8) -> Self {
        match code {
            1 => PickDrop::None,
            2 => PickDrop::CallAgency,
            3 => PickDrop::CoordinateWithDriver,
            _ => PickDrop::Scheduled,
        }
    }

    /// Whether passengers may board or alight under this permission.
    pub fn is_routable(self) -> bool {
        self != PickDrop::None
    }
}

/// An ordered stop sequence with per-stop pickup and dropoff permissions.
///
/// Two trips belong to the same pattern exactly when their stop patterns
/// are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StopPattern {
    stops: Vec<StopId>,
    pickups: Vec<PickDrop>,
    dropoffs: Vec<PickDrop>,
}

impl StopPattern {
    pub fn new(
        stops: Vec<StopId>,
        pickups: Vec<PickDrop>,
        dropoffs: Vec<PickDrop>,
    ) -> Result<Self, ScheduleError> {
        if pickups.len() != stops.len() || dropoffs.len() != stops.len() {
            return Err(ScheduleError::LengthMismatch {
                expected: stops.len(),
                actual: pickups.len().min(dropoffs.len()),
            });
        }
        if stops.len() < 2 {
            return Err(ScheduleError::TooFewStops(stops.len()));
        }
        Ok(Self {
            stops,
            pickups,
            dropoffs,
        })
    }

    /// A pattern where every stop allows both pickup and dropoff.
    pub fn all_scheduled(stops: Vec<StopId>) -> Result<Self, ScheduleError> {
        let n = stops.len();
        Self::new(
            stops,
            vec![PickDrop::Scheduled; n],
            vec![PickDrop::Scheduled; n],
        )
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn stops(&self) -> &[StopId] {
        &self.stops
    }

    pub fn pickup(&self, stop_index: usize) -> PickDrop {
        self.pickups[stop_index]
    }

    pub fn dropoff(&self, stop_index: usize) -> PickDrop {
        self.dropoffs[stop_index]
    }

    /// Copy of this pattern visiting `stops` instead, keeping permissions.
    pub fn with_stops(&self, stops: Vec<StopId>) -> Result<Self, ScheduleError> {
        Self::new(stops, self.pickups.clone(), self.dropoffs.clone())
    }
}

/// A stop pattern plus the metadata the search needs about it.
///
/// Immutable once built. A platform change in realtime data produces a new
/// pattern that points back to the original via [`TripPattern::original`].
#[derive(Debug, Clone, PartialEq)]
pub struct TripPattern {
    id: PatternId,
    feed_id: String,
    route_id: String,
    stop_pattern: StopPattern,
    wheelchair: Vec<bool>,
    exemplar: Option<Arc<Trip>>,
    original: Option<PatternId>,
    created_by_realtime: bool,
}

impl TripPattern {
    /// Build a pattern, taking per-stop wheelchair access from `stops`.
    pub fn new(
        id: PatternId,
        feed_id: impl Into<String>,
        route_id: impl Into<String>,
        stop_pattern: StopPattern,
        stops: &Stops,
    ) -> Self {
        let wheelchair = stop_pattern
            .stops()
            .iter()
            .map(|s| stops.wheelchair_accessible(s))
            .collect();
        Self {
            id,
            feed_id: feed_id.into(),
            route_id: route_id.into(),
            stop_pattern,
            wheelchair,
            exemplar: None,
            original: None,
            created_by_realtime: false,
        }
    }

    pub fn with_exemplar(mut self, trip: Arc<Trip>) -> Self {
        self.exemplar = Some(trip);
        self
    }

    /// Build a pattern for realtime data. `original` is the scheduled
    /// pattern the trip was moved away from, if any.
    pub fn realtime(
        id: PatternId,
        feed_id: impl Into<String>,
        route_id: impl Into<String>,
        stop_pattern: StopPattern,
        original: Option<PatternId>,
        stops: &Stops,
    ) -> Self {
        let mut pattern = Self::new(id, feed_id, route_id, stop_pattern, stops);
        pattern.original = original;
        pattern.created_by_realtime = true;
        pattern
    }

    pub fn id(&self) -> PatternId {
        self.id
    }

    pub fn feed_id(&self) -> &str {
        &self.feed_id
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn stop_pattern(&self) -> &StopPattern {
        &self.stop_pattern
    }

    pub fn num_stops(&self) -> usize {
        self.stop_pattern.len()
    }

    pub fn stop(&self, stop_index: usize) -> &StopId {
        &self.stop_pattern.stops()[stop_index]
    }

    pub fn stops(&self) -> &[StopId] {
        self.stop_pattern.stops()
    }

    pub fn can_board(&self, stop_index: usize) -> bool {
        self.stop_pattern.pickup(stop_index).is_routable()
    }

    pub fn can_alight(&self, stop_index: usize) -> bool {
        self.stop_pattern.dropoff(stop_index).is_routable()
    }

    pub fn wheelchair_accessible(&self, stop_index: usize) -> bool {
        self.wheelchair[stop_index]
    }

    pub fn exemplar(&self) -> Option<&Arc<Trip>> {
        self.exemplar.as_ref()
    }

    pub fn original(&self) -> Option<PatternId> {
        self.original
    }

    pub fn is_created_by_realtime(&self) -> bool {
        self.created_by_realtime
    }

    /// Position of `stop` in this pattern, if visited.
    pub fn find_stop(&self, stop: &StopId) -> Option<usize> {
        self.stops().iter().position(|s| s == stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Stop;

    fn ids(names: &[&str]) -> Vec<StopId> {
        names.iter().map(|n| StopId::new(n)).collect()
    }

    #[test]
    fn stop_pattern_requires_two_stops() {
        let err = StopPattern::all_scheduled(ids(&["A"])).unwrap_err();
        assert!(matches!(err, ScheduleError::TooFewStops(1)));
    }

    #[test]
    fn stop_pattern_rejects_permission_length_mismatch() {
        let err = StopPattern::new(
            ids(&["A", "B"]),
            vec![PickDrop::Scheduled],
            vec![PickDrop::Scheduled; 2],
        )
        .unwrap_err();
        assert!(matches!(err, ScheduleError::LengthMismatch { .. }));
    }

    #[test]
    fn equal_stop_patterns_hash_equal() {
        use std::collections::HashSet;
        let a = StopPattern::all_scheduled(ids(&["A", "B"])).unwrap();
        let b = StopPattern::all_scheduled(ids(&["A", "B"])).unwrap();
        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn permissions_from_stop_pattern() {
        let sp = StopPattern::new(
            ids(&["A", "B", "C"]),
            vec![PickDrop::Scheduled, PickDrop::None, PickDrop::None],
            vec![PickDrop::None, PickDrop::CallAgency, PickDrop::Scheduled],
        )
        .unwrap();
        let pattern = TripPattern::new(PatternId::new(0), "F", "R", sp, &Stops::new());
        assert!(pattern.can_board(0));
        assert!(!pattern.can_alight(0));
        assert!(!pattern.can_board(1));
        assert!(pattern.can_alight(1));
        assert!(pattern.can_alight(2));
    }

    #[test]
    fn wheelchair_flags_from_registry() {
        let stops: Stops = [
            Stop::new("A".into(), "A").with_wheelchair_boarding(true),
            Stop::new("B".into(), "B"),
        ]
        .into_iter()
        .collect();
        let sp = StopPattern::all_scheduled(ids(&["A", "B"])).unwrap();
        let pattern = TripPattern::new(PatternId::new(3), "F", "R", sp, &stops);
        assert!(pattern.wheelchair_accessible(0));
        assert!(!pattern.wheelchair_accessible(1));
        assert_eq!(pattern.id().to_string(), "P3");
    }

    #[test]
    fn realtime_pattern_records_origin() {
        let sp = StopPattern::all_scheduled(ids(&["A", "B"])).unwrap();
        let pattern = TripPattern::realtime(
            PatternId::new(9),
            "F",
            "R",
            sp,
            Some(PatternId::new(2)),
            &Stops::new(),
        );
        assert!(pattern.is_created_by_realtime());
        assert_eq!(pattern.original(), Some(PatternId::new(2)));
        assert_eq!(pattern.find_stop(&"B".into()), Some(1));
    }

    #[test]
    fn gtfs_codes() {
        assert_eq!(PickDrop::from_gtfs(0), PickDrop::Scheduled);
        assert_eq!(PickDrop::from_gtfs(1), PickDrop::None);
        assert!(!PickDrop::from_gtfs(1).is_routable());
        assert!(PickDrop::from_gtfs(2).is_routable());
    }
}
