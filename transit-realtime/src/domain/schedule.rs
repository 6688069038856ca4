//! Per-trip stop times, in scheduled and realtime variants.
//!
//! A [`TripSchedule`] is one row of a timetable. Scheduled rows are built
//! once from static data; realtime rows are derived from them by
//! copy-and-modify and keep a shared reference to the scheduled times so a
//! realtime row can always be recomputed from scratch.

use std::sync::Arc;

use super::error::ScheduleError;
use super::time::ServiceTime;
use super::trip::{Trip, TripId};

/// Why a schedule differs from its scheduled form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RealTimeState {
    /// Static data, no realtime information applied.
    #[default]
    Scheduled,
    /// Times changed on the original pattern.
    Updated,
    /// Stop sequence changed; the row lives on a realtime pattern.
    Modified,
    /// Trip not present in static data.
    Added,
    /// Whole trip cancelled.
    Canceled,
}

/// Per-stop realtime flags packed into a byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StopStatus(u8);

impl StopStatus {
    const RECORDED: u8 = 1 << 0;
    const PREDICTION_INACCURATE: u8 = 1 << 1;
    const CANCELLED: u8 = 1 << 2;
    const NO_PICKUP: u8 = 1 << 3;
    const NO_DROPOFF: u8 = 1 << 4;

    fn with(self, bit: u8, on: bool) -> Self {
        if on { Self(self.0 | bit) } else { Self(self.0 & !bit) }
    }

    /// Times at this stop were observed rather than predicted.
    pub fn is_recorded(self) -> bool {
        self.0 & Self::RECORDED != 0
    }

    pub fn is_prediction_inaccurate(self) -> bool {
        self.0 & Self::PREDICTION_INACCURATE != 0
    }

    pub fn is_cancelled(self) -> bool {
        self.0 & Self::CANCELLED != 0
    }

    pub fn is_no_pickup(self) -> bool {
        self.0 & Self::NO_PICKUP != 0
    }

    pub fn is_no_dropoff(self) -> bool {
        self.0 & Self::NO_DROPOFF != 0
    }

    pub fn recorded(self, on: bool) -> Self {
        self.with(Self::RECORDED, on)
    }

    pub fn prediction_inaccurate(self, on: bool) -> Self {
        self.with(Self::PREDICTION_INACCURATE, on)
    }

    pub fn cancelled(self, on: bool) -> Self {
        self.with(Self::CANCELLED, on)
    }

    pub fn no_pickup(self, on: bool) -> Self {
        self.with(Self::NO_PICKUP, on)
    }

    pub fn no_dropoff(self, on: bool) -> Self {
        self.with(Self::NO_DROPOFF, on)
    }

    pub fn allows_boarding(self) -> bool {
        !self.is_cancelled() && !self.is_no_pickup()
    }

    pub fn allows_alighting(self) -> bool {
        !self.is_cancelled() && !self.is_no_dropoff()
    }
}

impl std::fmt::Debug for StopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut flags = Vec::new();
        if self.is_recorded() {
            flags.push("recorded");
        }
        if self.is_prediction_inaccurate() {
            flags.push("inaccurate");
        }
        if self.is_cancelled() {
            flags.push("cancelled");
        }
        if self.is_no_pickup() {
            flags.push("no_pickup");
        }
        if self.is_no_dropoff() {
            flags.push("no_dropoff");
        }
        write!(f, "StopStatus[{}]", flags.join(","))
    }
}

/// Validated scheduled arrival and departure times for one trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTimes {
    arrivals: Vec<ServiceTime>,
    departures: Vec<ServiceTime>,
}

impl ScheduledTimes {
    pub fn new(
        arrivals: Vec<ServiceTime>,
        departures: Vec<ServiceTime>,
    ) -> Result<Self, ScheduleError> {
        check_times(&arrivals, &departures)?;
        Ok(Self {
            arrivals,
            departures,
        })
    }

    pub fn len(&self) -> usize {
        self.arrivals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.is_empty()
    }

    pub fn arrival(&self, stop_index: usize) -> ServiceTime {
        self.arrivals[stop_index]
    }

    pub fn departure(&self, stop_index: usize) -> ServiceTime {
        self.departures[stop_index]
    }
}

/// Check that `arrival[i] <= departure[i] <= arrival[i + 1]` for all `i`.
///
/// Reports the index of the first stop whose time goes backwards.
pub fn check_times(arrivals: &[ServiceTime], departures: &[ServiceTime]) -> Result<(), ScheduleError> {
    if arrivals.len() != departures.len() {
        return Err(ScheduleError::LengthMismatch {
            expected: arrivals.len(),
            actual: departures.len(),
        });
    }
    if arrivals.len() < 2 {
        return Err(ScheduleError::TooFewStops(arrivals.len()));
    }
    for i in 0..arrivals.len() {
        if departures[i] < arrivals[i] {
            return Err(ScheduleError::NonIncreasingTime(i));
        }
        if i + 1 < arrivals.len() && arrivals[i + 1] < departures[i] {
            return Err(ScheduleError::NonIncreasingTime(i + 1));
        }
    }
    Ok(())
}

/// One trip's concrete times at each stop of its pattern.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use transit_realtime::domain::{RealTimeState, ServiceTime, Trip, TripSchedule};
///
/// let trip = Arc::new(Trip::new("T1".into(), "R1", "WEEKDAY"));
/// let times = [0, 300, 600].map(ServiceTime::from_seconds).to_vec();
/// let schedule = TripSchedule::scheduled(trip, times.clone(), times).unwrap();
///
/// assert_eq!(schedule.state(), RealTimeState::Scheduled);
/// assert_eq!(schedule.departure_delay(1), 0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TripSchedule {
    trip: Arc<Trip>,
    scheduled: Arc<ScheduledTimes>,
    arrivals: Vec<ServiceTime>,
    departures: Vec<ServiceTime>,
    status: Vec<StopStatus>,
    state: RealTimeState,
}

impl TripSchedule {
    /// Build a scheduled row from static times.
    pub fn scheduled(
        trip: Arc<Trip>,
        arrivals: Vec<ServiceTime>,
        departures: Vec<ServiceTime>,
    ) -> Result<Self, ScheduleError> {
        let scheduled = Arc::new(ScheduledTimes::new(arrivals, departures)?);
        Ok(Self::from_scheduled_times(trip, scheduled, RealTimeState::Scheduled))
    }

    /// Build a fresh row with scheduled times and no realtime flags.
    pub fn from_scheduled_times(
        trip: Arc<Trip>,
        scheduled: Arc<ScheduledTimes>,
        state: RealTimeState,
    ) -> Self {
        let n = scheduled.len();
        Self {
            trip,
            arrivals: scheduled.arrivals.clone(),
            departures: scheduled.departures.clone(),
            scheduled,
            status: vec![StopStatus::default(); n],
            state,
        }
    }

    /// Derive a realtime row from this one with new times and flags.
    ///
    /// The scheduled back-reference is kept. Fails if the lengths differ
    /// from the scheduled row or the times decrease anywhere.
    pub fn with_realtime(
        &self,
        arrivals: Vec<ServiceTime>,
        departures: Vec<ServiceTime>,
        status: Vec<StopStatus>,
        state: RealTimeState,
    ) -> Result<Self, ScheduleError> {
        let n = self.scheduled.len();
        for len in [arrivals.len(), departures.len(), status.len()] {
            if len != n {
                return Err(ScheduleError::LengthMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        check_times(&arrivals, &departures)?;
        Ok(Self {
            trip: Arc::clone(&self.trip),
            scheduled: Arc::clone(&self.scheduled),
            arrivals,
            departures,
            status,
            state,
        })
    }

    /// A fresh copy with scheduled times and no realtime flags.
    pub fn reset_to_scheduled(&self) -> Self {
        Self::from_scheduled_times(
            Arc::clone(&self.trip),
            Arc::clone(&self.scheduled),
            RealTimeState::Scheduled,
        )
    }

    /// A copy with every stop cancelled and state [`RealTimeState::Canceled`].
    pub fn cancelled(&self) -> Self {
        let mut copy = self.clone();
        for status in &mut copy.status {
            *status = status.cancelled(true);
        }
        copy.state = RealTimeState::Canceled;
        copy
    }

    pub fn with_state(mut self, state: RealTimeState) -> Self {
        self.state = state;
        self
    }

    pub fn trip(&self) -> &Arc<Trip> {
        &self.trip
    }

    pub fn trip_id(&self) -> &TripId {
        &self.trip.id
    }

    pub fn scheduled_times(&self) -> &Arc<ScheduledTimes> {
        &self.scheduled
    }

    pub fn num_stops(&self) -> usize {
        self.arrivals.len()
    }

    pub fn arrival(&self, stop_index: usize) -> ServiceTime {
        self.arrivals[stop_index]
    }

    pub fn departure(&self, stop_index: usize) -> ServiceTime {
        self.departures[stop_index]
    }

    pub fn arrivals(&self) -> &[ServiceTime] {
        &self.arrivals
    }

    pub fn departures(&self) -> &[ServiceTime] {
        &self.departures
    }

    pub fn scheduled_arrival(&self, stop_index: usize) -> ServiceTime {
        self.scheduled.arrival(stop_index)
    }

    pub fn scheduled_departure(&self, stop_index: usize) -> ServiceTime {
        self.scheduled.departure(stop_index)
    }

    /// Realtime minus scheduled arrival, in seconds.
    pub fn arrival_delay(&self, stop_index: usize) -> i32 {
        self.arrivals[stop_index] - self.scheduled.arrival(stop_index)
    }

    /// Realtime minus scheduled departure, in seconds.
    pub fn departure_delay(&self, stop_index: usize) -> i32 {
        self.departures[stop_index] - self.scheduled.departure(stop_index)
    }

    pub fn status(&self, stop_index: usize) -> StopStatus {
        self.status[stop_index]
    }

    pub fn stop_statuses(&self) -> &[StopStatus] {
        &self.status
    }

    pub fn state(&self) -> RealTimeState {
        self.state
    }

    pub fn is_canceled(&self) -> bool {
        self.state == RealTimeState::Canceled
    }

    /// Whether any stop carries a cancellation or suppressed pickup/dropoff.
    pub fn has_stop_cancellations(&self) -> bool {
        self.status
            .iter()
            .any(|s| s.is_cancelled() || s.is_no_pickup() || s.is_no_dropoff())
    }

    pub fn can_board_at(&self, stop_index: usize) -> bool {
        !self.is_canceled() && self.status[stop_index].allows_boarding()
    }

    pub fn can_alight_at(&self, stop_index: usize) -> bool {
        !self.is_canceled() && self.status[stop_index].allows_alighting()
    }
}
