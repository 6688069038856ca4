//! Realtime updater configuration.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::loader::LoadError;
use crate::timetable::DEFAULT_INDEX_THRESHOLD;

/// Configuration for the snapshot source and its update pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Minimum time between two non-forced commits (milliseconds).
    /// Updates arriving in between are batched into the next snapshot.
    pub max_snapshot_frequency_ms: u64,

    /// Timetables with more rows than this get sorted search indices.
    /// Affects search speed only, never results.
    pub index_threshold: usize,

    /// Drop realtime timetables for service dates more than two days old.
    pub purge_expired_data: bool,

    /// Maximum number of realtime patterns kept for reuse.
    pub pattern_cache_capacity: u64,
}

impl UpdaterConfig {
    pub fn new(
        max_snapshot_frequency_ms: u64,
        index_threshold: usize,
        purge_expired_data: bool,
        pattern_cache_capacity: u64,
    ) -> Self {
        Self {
            max_snapshot_frequency_ms,
            index_threshold,
            purge_expired_data,
            pattern_cache_capacity,
        }
    }

    /// Read configuration from a JSON file. Missing fields take their
    /// default values.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Returns the commit throttle interval as a Duration.
    pub fn max_snapshot_frequency(&self) -> Duration {
        Duration::from_millis(self.max_snapshot_frequency_ms)
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            max_snapshot_frequency_ms: 1000,
            index_threshold: DEFAULT_INDEX_THRESHOLD,
            purge_expired_data: true,
            pattern_cache_capacity: 10_000,
        }
    }
}
