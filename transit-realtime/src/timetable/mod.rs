//! Timetable search engine.
//!
//! A [`Timetable`] holds the trips of one pattern and answers "next usable
//! trip leaving this stop" and "last usable trip arriving at this stop".
//! Headway-based service is described by [`FrequencyTimetable`]s attached to
//! the same timetable.

mod filter;
mod frequency;
mod index;
mod table;


pub use filter::TripFilter;
pub use frequency::{FrequencyEntry, FrequencyTimetable};
pub use table::{DEFAULT_INDEX_THRESHOLD, FrequencyMatch, Timetable, TripMatch};
