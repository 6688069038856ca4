//! Trips that exist only in realtime data.

use std::sync::Arc;

use crate::domain::{
    RealTimeState, ScheduleError, ScheduledTimes, StopId, StopPattern, StopStatus, Stops, Trip,
    TripSchedule,
};

use super::call::JourneyUpdate;
use super::error::UpdateError;

/// Route assigned to added trips whose update names none.
const UNKNOWN_ROUTE: &str = "realtime";

/// The pieces needed to install a trip unknown to the static network.
#[derive(Debug, Clone)]
pub struct AddedTrip {
    pub trip: Arc<Trip>,
    pub stop_pattern: StopPattern,
    pub schedule: TripSchedule,
}

/// Build a new trip from an update flagged as an extra journey.
///
/// Aimed times become the trip's scheduled times; expected and actual times
/// become its realtime times. Every call must name a known stop and carry
/// at least one time.
pub fn build_added_trip(update: &JourneyUpdate, stops: &Stops) -> Result<AddedTrip, UpdateError> {
    let trip_id = update
        .trip_id
        .clone()
        .ok_or(UpdateError::InvalidCallStructure("added trip without trip id"))?;
    if update.calls.len() < 2 {
        return Err(UpdateError::TooFewStops {
            required: 2,
            available: update.calls.len(),
        });
    }

    let n = update.calls.len();
    let mut stop_ids: Vec<StopId> = Vec::with_capacity(n);
    let mut aimed_arrivals = Vec::with_capacity(n);
    let mut aimed_departures = Vec::with_capacity(n);
    for call in &update.calls {
        if !stops.contains(&call.stop_id) {
            return Err(UpdateError::UnknownStop(call.stop_id.clone()));
        }
        let arrival = call
            .aimed_arrival
            .or(call.aimed_departure)
            .or(call.arrival())
            .or(call.departure());
        let departure = call
            .aimed_departure
            .or(call.aimed_arrival)
            .or(call.departure())
            .or(call.arrival());
        let (Some(arrival), Some(departure)) = (arrival, departure) else {
            return Err(UpdateError::InvalidCallStructure("added trip call without times"));
        };
        stop_ids.push(call.stop_id.clone());
        aimed_arrivals.push(arrival);
        aimed_departures.push(departure);
    }

    let scheduled =
        ScheduledTimes::new(aimed_arrivals, aimed_departures).map_err(to_update_error)?;

    let mut arrivals = Vec::with_capacity(n);
    let mut departures = Vec::with_capacity(n);
    let mut statuses = Vec::with_capacity(n);
    for (i, call) in update.calls.iter().enumerate() {
        let resolved = call.resolve_times(scheduled.arrival(i), scheduled.departure(i));
        arrivals.push(resolved.arrival);
        departures.push(resolved.departure);
        statuses.push(
            StopStatus::default()
                .recorded(resolved.recorded)
                .cancelled(call.cancelled)
                .no_dropoff(call.arrival_cancelled)
                .no_pickup(call.departure_cancelled)
                .prediction_inaccurate(update.prediction_inaccurate || call.prediction_inaccurate),
        );
    }

    let route = update.route_id.as_deref().unwrap_or(UNKNOWN_ROUTE);
    let trip = Arc::new(
        Trip::new(trip_id, route, "")
            .with_wheelchair_accessible(update.wheelchair_accessible.unwrap_or(false)),
    );
    let base = TripSchedule::from_scheduled_times(
        Arc::clone(&trip),
        Arc::new(scheduled),
        RealTimeState::Added,
    );
    let schedule = base
        .with_realtime(arrivals, departures, statuses, RealTimeState::Added)
        .map_err(to_update_error)?;
    let stop_pattern = StopPattern::all_scheduled(stop_ids).map_err(to_update_error)?;

    Ok(AddedTrip {
        trip,
        stop_pattern,
        schedule,
    })
}

fn to_update_error(e: ScheduleError) -> UpdateError {
    match e {
        ScheduleError::NonIncreasingTime(i) => UpdateError::NonIncreasingTime(i),
        ScheduleError::TooFewStops(n) => UpdateError::TooFewStops {
            required: 2,
            available: n,
        },
        ScheduleError::LengthMismatch { expected, actual } => {
            UpdateError::StopCountMismatch { expected, actual }
        }
        _ => UpdateError::InvalidCallStructure("added trip rejected"),
    }
}
