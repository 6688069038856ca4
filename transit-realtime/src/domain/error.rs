//! Domain error types.
//!
//! These errors represent validation failures when building schedule data.
//! They are distinct from realtime update and loading errors.

use super::time::TimeError;
use super::trip::TripId;

/// Errors raised while constructing patterns, schedules or frequencies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Parallel per-stop arrays have different lengths
    #[error("per-stop data has {actual} entries, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Times decrease at the given stop index
    #[error("times decrease at stop index {0}")]
    NonIncreasingTime(usize),

    /// A pattern or schedule needs at least two stops
    #[error("at least two stops required, got {0}")]
    TooFewStops(usize),

    /// A time string could not be parsed
    #[error(transparent)]
    InvalidTime(#[from] TimeError),

    /// A frequency entry has an empty range or non-positive headway
    #[error("invalid frequency: {0}")]
    InvalidFrequency(&'static str),

    /// A trip with this id is already in the network
    #[error("duplicate trip {0}")]
    DuplicateTrip(TripId),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServiceTime;

    #[test]
    fn error_display() {
        let err = ScheduleError::LengthMismatch {
            expected: 3,
            actual: 2,
        };
        assert_eq!(err.to_string(), "per-stop data has 2 entries, expected 3");

        let err = ScheduleError::NonIncreasingTime(4);
        assert_eq!(err.to_string(), "times decrease at stop index 4");

        let err = ScheduleError::TooFewStops(1);
        assert_eq!(err.to_string(), "at least two stops required, got 1");

        let err = ScheduleError::InvalidFrequency("headway must be positive");
        assert_eq!(err.to_string(), "invalid frequency: headway must be positive");

        let err: ScheduleError = ServiceTime::parse_hms("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("invalid time"));
    }
}
