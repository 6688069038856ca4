//! Stop identity and the stop registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

/// Identifier of a stop or platform, unique within the loaded network.
///
/// Cheap to clone: the underlying string is shared.
///
/// # Examples
///
/// ```
/// use transit_realtime::domain::StopId;
///
/// let a = StopId::new("NSR:Quay:1");
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "NSR:Quay:1");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(from = "String")]
pub struct StopId(Arc<str>);

impl StopId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StopId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl From<&str> for StopId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StopId({})", self.0)
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical stopping place: a platform, quay or bus stop.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// The station this stop belongs to, if any. Stops sharing a parent
    /// are interchangeable for platform-change matching.
    pub parent_station: Option<StopId>,
    pub wheelchair_boarding: bool,
}

impl Stop {
    pub fn new(id: StopId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            lat: 0.0,
            lon: 0.0,
            parent_station: None,
            wheelchair_boarding: false,
        }
    }

    pub fn with_parent(mut self, parent: StopId) -> Self {
        self.parent_station = Some(parent);
        self
    }

    pub fn with_wheelchair_boarding(mut self, accessible: bool) -> Self {
        self.wheelchair_boarding = accessible;
        self
    }

    /// Whether this stop and `other` are platforms of the same station.
    ///
    /// A stop is never considered part of the same station as another stop
    /// when either lacks a parent.
    pub fn is_part_of_same_station_as(&self, other: &Stop) -> bool {
        match (&self.parent_station, &other.parent_station) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Registry of all stops in the network, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Stops {
    by_id: HashMap<StopId, Arc<Stop>>,
}

impl Stops {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a stop, replacing any existing stop with the same id.
    pub fn insert(&mut self, stop: Stop) {
        self.by_id.insert(stop.id.clone(), Arc::new(stop));
    }

    pub fn get(&self, id: &StopId) -> Option<&Arc<Stop>> {
        self.by_id.get(id)
    }

    pub fn contains(&self, id: &StopId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Whether two stop ids refer to the same stop or to platforms of the
    /// same station. Unknown ids only match themselves.
    pub fn same_station(&self, a: &StopId, b: &StopId) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(a), Some(b)) => a.is_part_of_same_station_as(b),
            _ => false,
        }
    }

    /// Whether a wheelchair user can board or alight at the stop.
    pub fn wheelchair_accessible(&self, id: &StopId) -> bool {
        self.get(id).is_some_and(|s| s.wheelchair_boarding)
    }
}

impl FromIterator<Stop> for Stops {
    fn from_iter<T: IntoIterator<Item = Stop>>(iter: T) -> Self {
        let mut stops = Stops::new();
        for stop in iter {
            stops.insert(stop);
        }
        stops
    }
}
