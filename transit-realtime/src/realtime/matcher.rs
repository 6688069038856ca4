//! Resolving updates that do not name a trip.
//!
//! Some feeds identify a vehicle journey only by its line and the time it
//! leaves a stop. A [`TripMatcher`] turns such an update into a static trip
//! id, or gives up.

use crate::domain::TripId;
use crate::network::TransitData;

use super::call::JourneyUpdate;

/// Finds the static trip an update without a trip id refers to.
pub trait TripMatcher: Send + Sync {
    fn match_trip(&self, update: &JourneyUpdate, network: &TransitData) -> Option<TripId>;
}

/// Matches by route, first call stop and aimed departure at that stop.
///
/// Only an unambiguous match is returned: when two running trips of the
/// route leave the same stop at the same time, nothing is matched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteDepartureMatcher;

impl TripMatcher for RouteDepartureMatcher {
    fn match_trip(&self, update: &JourneyUpdate, network: &TransitData) -> Option<TripId> {
        let route = update.route_id.as_deref()?;
        let first = update.calls.first()?;
        let aimed = first.aimed_departure.or(first.aimed_arrival)?;

        let mut found: Option<TripId> = None;
        for pattern in network.patterns().iter().filter(|p| p.route_id() == route) {
            let Some(stop) = pattern.find_stop(&first.stop_id) else {
                continue;
            };
            let Some(timetable) = network.scheduled_timetable(pattern.id()) else {
                continue;
            };
            for schedule in timetable.trips() {
                if schedule.scheduled_departure(stop) != aimed
                    || !network.runs_on(schedule.trip(), update.service_date)
                {
                    continue;
                }
                if found.is_some() {
                    return None;
                }
                found = Some(schedule.trip_id().clone());
            }
        }
        found
    }
}
