//! Transit schedule store with realtime updates.
//!
//! Holds the scheduled timetables of a transit network, applies realtime
//! delay and cancellation updates to them, and publishes consistent
//! snapshots that route searches can query without blocking the writer.

pub mod config;
pub mod domain;
pub mod loader;
pub mod network;
pub mod realtime;
pub mod snapshot;
pub mod timetable;
