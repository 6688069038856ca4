//! Static network JSON DTOs.
//!
//! A GTFS-like document: stops, a service calendar and trips with their stop
//! times and optional frequencies. Times are `HH:MM:SS` strings relative to
//! service-day midnight and may exceed 24 hours.

use serde::Deserialize;

/// Top-level static network document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkDto {
    /// Feed this data belongs to; realtime feeds clear data per feed.
    pub feed_id: String,

    pub stops: Vec<StopDto>,

    /// Service dates per service id. Empty means every service runs daily.
    #[serde(default)]
    pub calendar: Vec<ServiceDatesDto>,

    pub trips: Vec<TripDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    pub parent_station: Option<String>,
    #[serde(default)]
    pub wheelchair_boarding: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDatesDto {
    pub service_id: String,
    /// ISO dates (`YYYY-MM-DD`).
    pub dates: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDto {
    pub id: String,
    pub route_id: String,
    pub service_id: String,
    #[serde(default)]
    pub wheelchair_accessible: bool,
    #[serde(default)]
    pub bikes_allowed: bool,
    pub stop_times: Vec<StopTimeDto>,
    /// When present the stop times are a template repeated over these ranges.
    #[serde(default)]
    pub frequencies: Vec<FrequencyDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopTimeDto {
    pub stop_id: String,
    /// Missing arrival defaults to the departure and vice versa.
    pub arrival: Option<String>,
    pub departure: Option<String>,
    /// GTFS `pickup_type` code.
    #[serde(default)]
    pub pickup_type: u8,
    /// GTFS `drop_off_type` code.
    #[serde(default)]
    pub drop_off_type: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyDto {
    pub start: String,
    pub end: String,
    pub headway_secs: i32,
    #[serde(default)]
    pub exact_times: bool,
}
