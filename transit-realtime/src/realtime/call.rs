//! Normalized realtime input: one journey update with its estimated calls.
//!
//! Feed-specific decoders produce these types; the applier consumes them.

use chrono::NaiveDate;

use crate::domain::{ServiceTime, StopId, TripId};

/// Realtime information about one visit of a vehicle to a stop.
///
/// Times are relative to the service date of the enclosing update.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatedCall {
    pub stop_id: StopId,
    /// Zero-based position in the pattern, when the feed supplies one.
    pub order: Option<usize>,
    pub aimed_arrival: Option<ServiceTime>,
    pub expected_arrival: Option<ServiceTime>,
    pub actual_arrival: Option<ServiceTime>,
    pub aimed_departure: Option<ServiceTime>,
    pub expected_departure: Option<ServiceTime>,
    pub actual_departure: Option<ServiceTime>,
    /// The vehicle skips this stop entirely.
    pub cancelled: bool,
    /// No alighting at this stop.
    pub arrival_cancelled: bool,
    /// No boarding at this stop.
    pub departure_cancelled: bool,
    pub prediction_inaccurate: bool,
}

/// Times resolved for a matched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTimes {
    pub arrival: ServiceTime,
    pub departure: ServiceTime,
    /// At least one time was observed rather than predicted.
    pub recorded: bool,
}

impl EstimatedCall {
    pub fn new(stop_id: StopId) -> Self {
        Self {
            stop_id,
            order: None,
            aimed_arrival: None,
            expected_arrival: None,
            actual_arrival: None,
            aimed_departure: None,
            expected_departure: None,
            actual_departure: None,
            cancelled: false,
            arrival_cancelled: false,
            departure_cancelled: false,
            prediction_inaccurate: false,
        }
    }

    pub fn with_order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_expected(
        mut self,
        arrival: Option<ServiceTime>,
        departure: Option<ServiceTime>,
    ) -> Self {
        self.expected_arrival = arrival;
        self.expected_departure = departure;
        self
    }

    pub fn with_actual(
        mut self,
        arrival: Option<ServiceTime>,
        departure: Option<ServiceTime>,
    ) -> Self {
        self.actual_arrival = arrival;
        self.actual_departure = departure;
        self
    }

    pub fn with_aimed(
        mut self,
        arrival: Option<ServiceTime>,
        departure: Option<ServiceTime>,
    ) -> Self {
        self.aimed_arrival = arrival;
        self.aimed_departure = departure;
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }

    /// Best known arrival: observed, then predicted, then aimed.
    pub fn arrival(&self) -> Option<ServiceTime> {
        self.actual_arrival
            .or(self.expected_arrival)
            .or(self.aimed_arrival)
    }

    /// Best known departure: observed, then predicted, then aimed.
    pub fn departure(&self) -> Option<ServiceTime> {
        self.actual_departure
            .or(self.expected_departure)
            .or(self.aimed_departure)
    }

    pub fn has_times(&self) -> bool {
        self.arrival().is_some() || self.departure().is_some()
    }

    /// Resolve arrival and departure against the scheduled times.
    ///
    /// Observed or predicted times win over aimed ones, which win over the
    /// schedule. When only one side is known the other inherits its delay.
    pub fn resolve_times(
        &self,
        scheduled_arrival: ServiceTime,
        scheduled_departure: ServiceTime,
    ) -> ResolvedTimes {
        let realtime = (
            self.actual_arrival.or(self.expected_arrival),
            self.actual_departure.or(self.expected_departure),
        );
        let known = match realtime {
            (None, None) => (self.aimed_arrival, self.aimed_departure),
            known => known,
        };
        let (arrival, departure) = match known {
            (Some(a), Some(d)) => (a, d),
            (Some(a), None) => (a, scheduled_departure + (a - scheduled_arrival)),
            (None, Some(d)) => (scheduled_arrival + (d - scheduled_departure), d),
            (None, None) => (scheduled_arrival, scheduled_departure),
        };
        ResolvedTimes {
            arrival,
            departure,
            recorded: self.actual_arrival.is_some() || self.actual_departure.is_some(),
        }
    }
}

/// Realtime information about one trip on one service date.
#[derive(Debug, Clone, PartialEq)]
pub struct JourneyUpdate {
    /// `None` when the feed only identifies the trip indirectly.
    pub trip_id: Option<TripId>,
    pub service_date: NaiveDate,
    pub route_id: Option<String>,
    pub cancelled: bool,
    pub prediction_inaccurate: bool,
    /// The trip is not part of the static schedule.
    pub extra_journey: bool,
    pub wheelchair_accessible: Option<bool>,
    pub calls: Vec<EstimatedCall>,
}

impl JourneyUpdate {
    pub fn new(trip_id: TripId, service_date: NaiveDate) -> Self {
        Self {
            trip_id: Some(trip_id),
            service_date,
            route_id: None,
            cancelled: false,
            prediction_inaccurate: false,
            extra_journey: false,
            wheelchair_accessible: None,
            calls: Vec::new(),
        }
    }

    pub fn with_calls(mut self, calls: Vec<EstimatedCall>) -> Self {
        self.calls = calls;
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.cancelled = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: i32) -> ServiceTime {
        ServiceTime::from_seconds(s)
    }

    #[test]
    fn actual_beats_expected_beats_aimed() {
        let call = EstimatedCall::new("A".into())
            .with_aimed(Some(t(100)), Some(t(100)))
            .with_expected(Some(t(200)), Some(t(210)));
        assert_eq!(call.arrival(), Some(t(200)));

        let call = call.with_actual(None, Some(t(250)));
        assert_eq!(call.departure(), Some(t(250)));
        assert_eq!(call.arrival(), Some(t(200)));
    }

    #[test]
    fn missing_arrival_inherits_departure_delay() {
        let call = EstimatedCall::new("A".into()).with_actual(None, Some(t(420)));
        let resolved = call.resolve_times(t(290), t(300));
        assert_eq!(resolved.arrival, t(410));
        assert_eq!(resolved.departure, t(420));
        assert!(resolved.recorded);
    }

    #[test]
    fn missing_departure_inherits_arrival_delay() {
        let call = EstimatedCall::new("A".into()).with_expected(Some(t(360)), None);
        let resolved = call.resolve_times(t(300), t(330));
        assert_eq!(resolved.departure, t(390));
        assert!(!resolved.recorded);
    }

    #[test]
    fn expected_arrival_beats_aimed_departure() {
        let call = EstimatedCall::new("A".into())
            .with_aimed(Some(t(200)), Some(t(210)))
            .with_expected(Some(t(260)), None);
        let resolved = call.resolve_times(t(200), t(210));
        assert_eq!((resolved.arrival, resolved.departure), (t(260), t(270)));
    }

    #[test]
    fn aimed_times_used_without_predictions() {
        let call = EstimatedCall::new("A".into()).with_aimed(Some(t(230)), None);
        let resolved = call.resolve_times(t(200), t(210));
        assert_eq!((resolved.arrival, resolved.departure), (t(230), t(240)));
    }

    #[test]
    fn no_times_falls_back_to_schedule() {
        let call = EstimatedCall::new("A".into()).cancelled();
        assert!(!call.has_times());
        let resolved = call.resolve_times(t(300), t(330));
        assert_eq!((resolved.arrival, resolved.departure), (t(300), t(330)));
    }
}
