//! Versioned realtime timetables.
//!
//! A single writer edits a [`TimetableBuffer`]; each commit publishes an
//! immutable [`Snapshot`] that readers hold for the length of a search.
//! [`SnapshotSource`] ties the two together behind locks and runs incoming
//! updates through the applier.

mod buffer;
mod pattern_cache;
#[allow(clippy::module_inception)]
mod snapshot;
mod source;


pub use buffer::TimetableBuffer;
pub use pattern_cache::{PatternKey, RealtimePatternCache};
pub use snapshot::{ServiceDayMatch, Snapshot, TimetableKey};
pub use source::SnapshotSource;
