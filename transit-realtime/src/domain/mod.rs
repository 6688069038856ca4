//! Domain types for the transit schedule store.
//!
//! This module contains the validated value types that describe the static
//! network: stops, trips, patterns and per-trip schedules. All types enforce
//! their invariants at construction time, so code that receives these types
//! can trust their validity.

mod error;
mod pattern;
mod schedule;
mod stop;
mod time;
mod trip;

pub use error::ScheduleError;
pub use pattern::{PatternId, PickDrop, StopPattern, TripPattern};
pub use schedule::{RealTimeState, ScheduledTimes, StopStatus, TripSchedule, check_times};
pub use stop::{Stop, StopId, Stops};
pub use time::{SECONDS_PER_DAY, ServiceDay, ServiceTime, TimeError};
pub use trip::{Trip, TripId};
