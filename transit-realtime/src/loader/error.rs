//! Errors raised while reading static data and realtime feed files.

use crate::domain::{ScheduleError, StopId, TimeError};

/// Failure to turn a JSON document into domain data.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A time or date string could not be parsed
    #[error("invalid time {value:?}: {reason}")]
    InvalidTime { value: String, reason: String },

    /// A field holds a value outside its allowed range
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// A trip refers to a stop that was not declared
    #[error("unknown stop {0}")]
    UnknownStop(StopId),

    /// Trip or frequency data violates schedule invariants
    #[error("invalid schedule for trip {trip}: {source}")]
    Schedule {
        trip: String,
        #[source]
        source: ScheduleError,
    },
}

impl LoadError {
    pub(crate) fn time(value: &str, err: TimeError) -> Self {
        LoadError::InvalidTime {
            value: value.to_string(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn date(value: &str, err: chrono::ParseError) -> Self {
        LoadError::InvalidTime {
            value: value.to_string(),
            reason: err.to_string(),
        }
    }
}
