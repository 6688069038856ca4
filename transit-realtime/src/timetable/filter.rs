//! Per-query trip filters.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{RealTimeState, TripId, TripSchedule};

/// Restrictions a trip must satisfy to be returned by a timetable search.
///
/// # Examples
///
/// ```
/// use transit_realtime::timetable::TripFilter;
///
/// let filter = TripFilter::new()
///     .with_wheelchair(true)
///     .with_banned_trip("T9".into());
/// assert!(filter.requires_wheelchair());
/// assert!(filter.is_banned(&"T9".into()));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TripFilter {
    wheelchair: bool,
    bicycle: bool,
    banned_trips: HashSet<TripId>,
    active_services: Option<Arc<HashSet<String>>>,
}

impl TripFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require both stop and trip to be wheelchair accessible.
    pub fn with_wheelchair(mut self, wheelchair: bool) -> Self {
        self.wheelchair = wheelchair;
        self
    }

    /// Require the trip to carry bicycles.
    pub fn with_bicycle(mut self, bicycle: bool) -> Self {
        self.bicycle = bicycle;
        self
    }

    pub fn with_banned_trip(mut self, trip: TripId) -> Self {
        self.banned_trips.insert(trip);
        self
    }

    pub fn with_banned_trips(mut self, trips: impl IntoIterator<Item = TripId>) -> Self {
        self.banned_trips.extend(trips);
        self
    }

    /// Only accept trips whose service id is in `services`. Trips added by
    /// realtime data have no calendar and always pass.
    pub fn with_active_services(mut self, services: Arc<HashSet<String>>) -> Self {
        self.active_services = Some(services);
        self
    }

    pub fn requires_wheelchair(&self) -> bool {
        self.wheelchair
    }

    pub fn requires_bicycle(&self) -> bool {
        self.bicycle
    }

    pub fn is_banned(&self, trip: &TripId) -> bool {
        self.banned_trips.contains(trip)
    }

    /// Trip-level checks. Stop-level permissions are checked by the caller.
    pub fn accepts(&self, schedule: &TripSchedule) -> bool {
        let trip = schedule.trip();
        if self.wheelchair && !trip.wheelchair_accessible {
            return false;
        }
        if self.bicycle && !trip.bikes_allowed {
            return false;
        }
        if schedule.state() != RealTimeState::Added
            && self
                .active_services
                .as_ref()
                .is_some_and(|active| !active.contains(&trip.service_id))
        {
            return false;
        }
        !self.banned_trips.contains(&trip.id)
    }
}
