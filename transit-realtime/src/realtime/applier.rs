//! Delay propagation: turn a partial list of observed calls into a complete,
//! consistent trip schedule.
//!
//! The applier walks the pattern's stops in order and matches each to the
//! next unconsumed call, by position when the feed gives one, otherwise by
//! stop identity or same-station equivalence. Matched stops take the call's
//! times. Unmatched stops carry forward the last matched departure delay;
//! stops before the first match keep the times they already had. Skipped
//! stops (no pickup and no dropoff) collapse onto the previous departure.
//!
//! The result is validated, never repaired: decreasing times reject the
//! whole update.

use tracing::trace;

use crate::domain::{
    RealTimeState, ScheduleError, ServiceTime, StopId, StopStatus, Stops, TripPattern,
    TripSchedule,
};

use super::call::{EstimatedCall, JourneyUpdate};
use super::error::UpdateError;

/// A revised schedule ready to be installed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedUpdate {
    pub schedule: TripSchedule,
    /// Set when a call moved the trip to another platform of the same
    /// station. The caller must install the schedule on a pattern visiting
    /// these stops instead of the original one.
    pub modified_stops: Option<Vec<StopId>>,
}

/// Applies journey updates to trip schedules.
#[derive(Debug, Clone, Copy)]
pub struct UpdateApplier<'a> {
    stops: &'a Stops,
}

impl<'a> UpdateApplier<'a> {
    pub fn new(stops: &'a Stops) -> Self {
        Self { stops }
    }

    /// Compute the revised schedule for `current`, the trip's latest row on
    /// `pattern`.
    ///
    /// The result is rebuilt from the scheduled times, so cancellations from
    /// earlier updates do not survive a later non-cancelling update.
    pub fn apply(
        &self,
        pattern: &TripPattern,
        current: &TripSchedule,
        update: &JourneyUpdate,
    ) -> Result<AppliedUpdate, UpdateError> {
        let n = pattern.num_stops();
        if current.num_stops() != n {
            return Err(UpdateError::StopCountMismatch {
                expected: n,
                actual: current.num_stops(),
            });
        }

        if update.cancelled {
            trace!(trip = %current.trip_id(), "cancelling whole trip");
            return Ok(AppliedUpdate {
                schedule: current.cancelled(),
                modified_stops: None,
            });
        }

        if update.calls.is_empty() {
            return Err(UpdateError::EmptyUpdate(current.trip_id().clone()));
        }
        if update.calls.len() > n {
            return Err(UpdateError::TooFewStops {
                required: update.calls.len(),
                available: n,
            });
        }
        check_call_order(&update.calls, n)?;

        let mut arrivals: Vec<ServiceTime> = Vec::with_capacity(n);
        let mut departures: Vec<ServiceTime> = Vec::with_capacity(n);
        let mut statuses = Vec::with_capacity(n);
        let mut calls = update.calls.iter().peekable();
        let mut last_delay: Option<i32> = None;
        let mut modified_stops: Option<Vec<StopId>> = None;

        for i in 0..n {
            let scheduled_arrival = current.scheduled_arrival(i);
            let scheduled_departure = current.scheduled_departure(i);
            let stop = pattern.stop(i);
            let mut status = StopStatus::default().prediction_inaccurate(update.prediction_inaccurate);

            let (arrival, departure) = match calls.next_if(|c| self.matches(c, i, stop)) {
                Some(call) => {
                    if call.stop_id != *stop {
                        if !self.stops.same_station(&call.stop_id, stop) {
                            return Err(UpdateError::InvalidCallStructure(
                                "call stop is not at the pattern stop's station",
                            ));
                        }
                        modified_stops.get_or_insert_with(|| pattern.stops().to_vec())[i] =
                            call.stop_id.clone();
                    }
                    let resolved = call.resolve_times(scheduled_arrival, scheduled_departure);
                    status = status
                        .recorded(resolved.recorded)
                        .cancelled(call.cancelled)
                        .no_dropoff(call.arrival_cancelled)
                        .no_pickup(call.departure_cancelled)
                        .prediction_inaccurate(
                            update.prediction_inaccurate || call.prediction_inaccurate,
                        );
                    last_delay = Some(resolved.departure - scheduled_departure);
                    (resolved.arrival, resolved.departure)
                }
                None if i > 0 && !pattern.can_board(i) && !pattern.can_alight(i) => {
                    let previous = departures[i - 1];
                    (previous, previous)
                }
                None => match last_delay {
                    Some(delay) => (scheduled_arrival + delay, scheduled_departure + delay),
                    None => (current.arrival(i), current.departure(i)),
                },
            };

            arrivals.push(arrival);
            departures.push(departure);
            statuses.push(status);
        }

        if calls.peek().is_some() {
            return Err(UpdateError::InvalidCallStructure(
                "calls do not follow the pattern's stop order",
            ));
        }

        let state = if modified_stops.is_some() {
            RealTimeState::Modified
        } else {
            RealTimeState::Updated
        };

        let schedule = current
            .with_realtime(arrivals, departures, statuses, state)
            .map_err(|e| match e {
                ScheduleError::NonIncreasingTime(i) => UpdateError::NonIncreasingTime(i),
                ScheduleError::LengthMismatch { expected, actual } => {
                    UpdateError::StopCountMismatch { expected, actual }
                }
                _ => UpdateError::InvalidCallStructure("schedule rejected"),
            })?;

        if schedule.num_stops() != n {
            return Err(UpdateError::StopCountMismatch {
                expected: n,
                actual: schedule.num_stops(),
            });
        }

        Ok(AppliedUpdate {
            schedule,
            modified_stops,
        })
    }

    fn matches(&self, call: &EstimatedCall, stop_index: usize, stop: &StopId) -> bool {
        match call.order {
            Some(order) => order == stop_index,
            None => call.stop_id == *stop || self.stops.same_station(&call.stop_id, stop),
        }
    }
}

/// Positions given by the feed must be in range and strictly increasing.
fn check_call_order(calls: &[EstimatedCall], num_stops: usize) -> Result<(), UpdateError> {
    let mut previous: Option<usize> = None;
    for order in calls.iter().filter_map(|c| c.order) {
        if order >= num_stops {
            return Err(UpdateError::InvalidCallStructure("call order beyond last stop"));
        }
        if previous.is_some_and(|p| order <= p) {
            return Err(UpdateError::InvalidCallStructure("call order not increasing"));
        }
        previous = Some(order);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatternId, PickDrop, Stop, StopPattern, Trip};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn t(s: i32) -> ServiceTime {
        ServiceTime::from_seconds(s)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn stops() -> Stops {
        [
            Stop::new("A".into(), "A"),
            Stop::new("B1".into(), "B platform 1").with_parent("B".into()),
            Stop::new("B2".into(), "B platform 2").with_parent("B".into()),
            Stop::new("C".into(), "C"),
            Stop::new("D".into(), "D"),
        ]
        .into_iter()
        .collect()
    }

    fn pattern(ids: &[&str]) -> TripPattern {
        let sp = StopPattern::all_scheduled(ids.iter().map(|s| StopId::new(s)).collect()).unwrap();
        TripPattern::new(PatternId::new(0), "F", "R", sp, &stops())
    }

    fn schedule(times: &[i32]) -> TripSchedule {
        let times: Vec<_> = times.iter().copied().map(t).collect();
        TripSchedule::scheduled(Arc::new(Trip::new("T1".into(), "R", "S")), times.clone(), times)
            .unwrap()
    }

    fn update(calls: Vec<EstimatedCall>) -> JourneyUpdate {
        JourneyUpdate::new("T1".into(), date()).with_calls(calls)
    }

    fn apply(pattern: &TripPattern, current: &TripSchedule, u: &JourneyUpdate) -> Result<AppliedUpdate, UpdateError> {
        let stops = stops();
        UpdateApplier::new(&stops).apply(pattern, current, u)
    }

    #[test]
    fn delay_propagates_to_unmatched_later_stops() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![EstimatedCall::new("B1".into()).with_actual(None, Some(t(420)))]);

        let applied = apply(&p, &s, &u).unwrap();
        let r = &applied.schedule;
        assert_eq!(r.departure(2), t(720));
        assert_eq!(r.departure_delay(2), 120);
        assert_eq!(r.departure(1), t(420));
        assert_eq!(r.departure(0), t(0));
        assert!(r.status(1).is_recorded());
        assert!(!r.status(2).is_recorded());
        assert_eq!(r.state(), RealTimeState::Updated);
        assert!(applied.modified_stops.is_none());
    }

    #[test]
    fn stops_before_first_match_keep_current_times() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let delayed = apply(
            &p,
            &s,
            &update(vec![EstimatedCall::new("A".into()).with_expected(None, Some(t(60)))]),
        )
        .unwrap()
        .schedule;
        assert_eq!(delayed.departure(0), t(60));

        let later = apply(
            &p,
            &delayed,
            &update(vec![EstimatedCall::new("C".into()).with_expected(Some(t(700)), None)]),
        )
        .unwrap()
        .schedule;
        assert_eq!(later.departure(0), t(60));
        assert_eq!(later.departure(1), t(360));
        assert_eq!(later.arrival(2), t(700));
    }

    #[test]
    fn whole_trip_cancellation() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let applied = apply(&p, &s, &update(vec![]).cancelled()).unwrap();
        assert!(applied.schedule.is_canceled());
        assert!((0..3).all(|i| applied.schedule.status(i).is_cancelled()));
    }

    #[test]
    fn cancel_then_update_leaves_no_cancellation() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let cancelled = apply(&p, &s, &update(vec![]).cancelled()).unwrap().schedule;
        let restored = apply(
            &p,
            &cancelled,
            &update(vec![EstimatedCall::new("A".into()).with_expected(None, Some(t(30)))]),
        )
        .unwrap()
        .schedule;
        assert_eq!(restored.state(), RealTimeState::Updated);
        assert!(!restored.is_canceled());
        assert!(!restored.has_stop_cancellations());
    }

    #[test]
    fn platform_change_marks_modified() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![EstimatedCall::new("B2".into()).with_expected(Some(t(300)), Some(t(300)))]);
        let applied = apply(&p, &s, &u).unwrap();
        assert_eq!(applied.schedule.state(), RealTimeState::Modified);
        let stops = applied.modified_stops.unwrap();
        assert_eq!(stops[1].as_str(), "B2");
        assert_eq!(stops[0].as_str(), "A");
    }

    #[test]
    fn ordered_call_at_other_station_rejected() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![EstimatedCall::new("D".into()).with_order(1)]);
        assert!(matches!(
            apply(&p, &s, &u),
            Err(UpdateError::InvalidCallStructure(_))
        ));
    }

    #[test]
    fn decreasing_times_rejected() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![
            EstimatedCall::new("A".into()).with_expected(None, Some(t(500))),
            EstimatedCall::new("B1".into()).with_expected(Some(t(400)), Some(t(400))),
        ]);
        assert_eq!(apply(&p, &s, &u), Err(UpdateError::NonIncreasingTime(1)));
    }

    #[test]
    fn explicit_departure_before_arrival_rejected() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![
            EstimatedCall::new("B1".into()).with_expected(Some(t(400)), Some(t(350))),
        ]);
        assert_eq!(apply(&p, &s, &u), Err(UpdateError::NonIncreasingTime(1)));
    }

    #[test]
    fn too_many_calls_rejected() {
        let p = pattern(&["A", "C"]);
        let s = schedule(&[0, 300]);
        let u = update(vec![
            EstimatedCall::new("A".into()),
            EstimatedCall::new("B1".into()),
            EstimatedCall::new("C".into()),
        ]);
        assert!(matches!(
            apply(&p, &s, &u),
            Err(UpdateError::TooFewStops { required: 3, available: 2 })
        ));
    }

    #[test]
    fn empty_update_rejected() {
        let p = pattern(&["A", "C"]);
        let s = schedule(&[0, 300]);
        assert!(matches!(apply(&p, &s, &update(vec![])), Err(UpdateError::EmptyUpdate(_))));
    }

    #[test]
    fn unmatched_call_rejected() {
        let p = pattern(&["A", "C"]);
        let s = schedule(&[0, 300]);
        let u = update(vec![EstimatedCall::new("D".into())]);
        assert!(matches!(
            apply(&p, &s, &u),
            Err(UpdateError::InvalidCallStructure(_))
        ));
    }

    #[test]
    fn out_of_order_calls_rejected() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![
            EstimatedCall::new("C".into()).with_order(2),
            EstimatedCall::new("A".into()).with_order(0),
        ]);
        assert!(matches!(
            apply(&p, &s, &u),
            Err(UpdateError::InvalidCallStructure(_))
        ));
    }

    #[test]
    fn wrong_length_schedule_rejected() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300]);
        let u = update(vec![EstimatedCall::new("A".into())]);
        assert!(matches!(
            apply(&p, &s, &u),
            Err(UpdateError::StopCountMismatch { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn skipped_stop_collapses_to_previous_departure() {
        let sp = StopPattern::new(
            vec!["A".into(), "B1".into(), "C".into()],
            vec![PickDrop::Scheduled, PickDrop::None, PickDrop::Scheduled],
            vec![PickDrop::Scheduled, PickDrop::None, PickDrop::Scheduled],
        )
        .unwrap();
        let p = TripPattern::new(PatternId::new(0), "F", "R", sp, &stops());
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![EstimatedCall::new("A".into()).with_expected(None, Some(t(120)))]);
        let r = apply(&p, &s, &u).unwrap().schedule;
        assert_eq!(r.arrival(1), t(120));
        assert_eq!(r.departure(1), t(120));
        assert_eq!(r.departure(2), t(720));
    }

    #[test]
    fn per_call_flags() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let mut b = EstimatedCall::new("B1".into());
        b.departure_cancelled = true;
        b.prediction_inaccurate = true;
        let mut c = EstimatedCall::new("C".into());
        c.arrival_cancelled = true;
        let mut u = update(vec![EstimatedCall::new("A".into()).cancelled(), b, c]);
        u.prediction_inaccurate = false;

        let r = apply(&p, &s, &u).unwrap().schedule;
        assert!(r.status(0).is_cancelled());
        assert!(!r.can_board_at(0));
        assert!(r.status(1).is_no_pickup());
        assert!(r.can_alight_at(1));
        assert!(r.status(1).is_prediction_inaccurate());
        assert!(r.status(2).is_no_dropoff());
        assert!(!r.status(2).is_prediction_inaccurate());
        assert!(!r.is_canceled());
    }

    #[test]
    fn journey_inaccuracy_marks_every_stop() {
        let p = pattern(&["A", "B1", "C"]);
        let s = schedule(&[0, 300, 600]);
        let mut u = update(vec![EstimatedCall::new("A".into())]);
        u.prediction_inaccurate = true;
        let r = apply(&p, &s, &u).unwrap().schedule;
        assert!((0..3).all(|i| r.status(i).is_prediction_inaccurate()));
    }

    #[test]
    fn calls_matched_by_order() {
        let p = pattern(&["A", "B1", "A"]);
        let s = schedule(&[0, 300, 600]);
        let u = update(vec![
            EstimatedCall::new("A".into())
                .with_order(2)
                .with_expected(Some(t(650)), None),
        ]);
        let r = apply(&p, &s, &u).unwrap().schedule;
        assert_eq!(r.departure(0), t(0));
        assert_eq!(r.arrival(2), t(650));
    }
}
