//! Realtime update errors and per-batch statistics.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;

use crate::domain::{StopId, TripId};

/// Why a single realtime update was rejected.
///
/// A rejected update leaves the buffer untouched for that trip; the
/// previously published data stays in effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    /// The trip has no row in the timetable it should be installed into
    #[error("trip {0} not found in pattern")]
    TripNotFoundInPattern(TripId),

    /// More calls than the pattern has stops, or too few calls for a new trip
    #[error("too few stops: {required} required, {available} available")]
    TooFewStops { required: usize, available: usize },

    /// Stop count of the result differs from the pattern
    #[error("stop count mismatch: pattern has {expected}, schedule has {actual}")]
    StopCountMismatch { expected: usize, actual: usize },

    /// Times would decrease at the given stop index
    #[error("non-increasing time at stop index {0}")]
    NonIncreasingTime(usize),

    /// The trip does not run on the requested service date
    #[error("trip {trip} does not run on {date}")]
    NoServiceForDate { trip: TripId, date: NaiveDate },

    /// Calls are malformed or do not line up with the pattern
    #[error("invalid call structure: {0}")]
    InvalidCallStructure(&'static str),

    /// No trip could be resolved for an update without a trip id
    #[error("no trip matched the update")]
    NoFuzzyMatch,

    /// Trip id unknown and the update does not describe a new trip
    #[error("unknown trip {0}")]
    UnknownTrip(TripId),

    /// A new trip visits a stop missing from the network
    #[error("unknown stop {0}")]
    UnknownStop(StopId),

    /// A non-cancelling update carries no calls
    #[error("update for trip {0} has no calls")]
    EmptyUpdate(TripId),
}

/// Copyable discriminant of [`UpdateError`], used for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UpdateErrorKind {
    TripNotFoundInPattern,
    TooFewStops,
    StopCountMismatch,
    NonIncreasingTime,
    NoServiceForDate,
    InvalidCallStructure,
    NoFuzzyMatch,
    UnknownTrip,
    UnknownStop,
    EmptyUpdate,
}

impl UpdateError {
    pub fn kind(&self) -> UpdateErrorKind {
        match self {
            UpdateError::TripNotFoundInPattern(_) => UpdateErrorKind::TripNotFoundInPattern,
            UpdateError::TooFewStops { .. } => UpdateErrorKind::TooFewStops,
            UpdateError::StopCountMismatch { .. } => UpdateErrorKind::StopCountMismatch,
            UpdateError::NonIncreasingTime(_) => UpdateErrorKind::NonIncreasingTime,
            UpdateError::NoServiceForDate { .. } => UpdateErrorKind::NoServiceForDate,
            UpdateError::InvalidCallStructure(_) => UpdateErrorKind::InvalidCallStructure,
            UpdateError::NoFuzzyMatch => UpdateErrorKind::NoFuzzyMatch,
            UpdateError::UnknownTrip(_) => UpdateErrorKind::UnknownTrip,
            UpdateError::UnknownStop(_) => UpdateErrorKind::UnknownStop,
            UpdateError::EmptyUpdate(_) => UpdateErrorKind::EmptyUpdate,
        }
    }
}

/// Outcome counts for a batch of updates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateResult {
    successful: usize,
    failures: HashMap<UpdateErrorKind, usize>,
}

impl UpdateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: &Result<(), UpdateError>) {
        match outcome {
            Ok(()) => self.successful += 1,
            Err(e) => *self.failures.entry(e.kind()).or_insert(0) += 1,
        }
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }

    pub fn total(&self) -> usize {
        self.successful + self.failed()
    }

    pub fn failures_of(&self, kind: UpdateErrorKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Add the counts of `other` into `self`.
    pub fn merge(&mut self, other: &UpdateResult) {
        self.successful += other.successful;
        for (kind, count) in &other.failures {
            *self.failures.entry(*kind).or_insert(0) += count;
        }
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} updates applied", self.successful, self.total())?;
        let mut kinds: Vec<_> = self.failures.iter().collect();
        kinds.sort();
        for (kind, count) in kinds {
            write!(f, ", {kind:?}: {count}")?;
        }
        Ok(())
    }
}
