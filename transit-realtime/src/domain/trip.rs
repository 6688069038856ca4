//! Trip identity and trip-level metadata.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Identifier of a trip, unique within the loaded network.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct TripId(Arc<str>);

impl TripId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TripId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&str> for TripId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TripId({})", self.0)
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single vehicle journey, independent of the times it runs at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trip {
    pub id: TripId,
    pub route_id: String,
    /// Calendar entry deciding on which service days the trip runs.
    pub service_id: String,
    pub wheelchair_accessible: bool,
    pub bikes_allowed: bool,
}

impl Trip {
    pub fn new(id: TripId, route_id: impl Into<String>, service_id: impl Into<String>) -> Self {
        Self {
            id,
            route_id: route_id.into(),
            service_id: service_id.into(),
            wheelchair_accessible: false,
            bikes_allowed: false,
        }
    }

    pub fn with_wheelchair_accessible(mut self, accessible: bool) -> Self {
        self.wheelchair_accessible = accessible;
        self
    }

    pub fn with_bikes_allowed(mut self, allowed: bool) -> Self {
        self.bikes_allowed = allowed;
        self
    }
}
