//! Conversion from static network DTOs to [`TransitData`].
//!
//! Invalid trips are logged and skipped rather than failing the whole load;
//! malformed stops or calendar dates fail the load.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::{PickDrop, ServiceTime, Stop, StopId, StopPattern, Stops, Trip};
use crate::network::{TransitData, TransitDataBuilder};
use crate::timetable::FrequencyEntry;

use super::error::LoadError;
use super::types::{FrequencyDto, NetworkDto, StopDto, TripDto};

/// Build the network from a parsed document.
pub fn convert_network(dto: &NetworkDto, index_threshold: usize) -> Result<TransitData, LoadError> {
    let mut builder = TransitDataBuilder::new(dto.feed_id.clone());

    for stop in &dto.stops {
        builder.add_stop(convert_stop(stop));
    }

    for entry in &dto.calendar {
        for date in &entry.dates {
            builder.add_service_date(entry.service_id.clone(), parse_date(date)?);
        }
    }

    let mut skipped = 0usize;
    for trip in &dto.trips {
        if let Err(e) = add_trip(&mut builder, trip) {
            warn!(trip = %trip.id, error = %e, "skipping invalid trip");
            skipped += 1;
        }
    }

    let data = builder.build(index_threshold);
    debug!(
        feed = %data.feed_id(),
        stops = data.stops().len(),
        patterns = data.pattern_count(),
        trips = data.trip_count(),
        skipped,
        "network loaded"
    );
    Ok(data)
}

fn convert_stop(dto: &StopDto) -> Stop {
    let mut stop = Stop::new(StopId::new(&dto.id), dto.name.clone())
        .with_wheelchair_boarding(dto.wheelchair_boarding);
    stop.lat = dto.lat;
    stop.lon = dto.lon;
    if let Some(parent) = &dto.parent_station {
        stop = stop.with_parent(StopId::new(parent));
    }
    stop
}

/// Parse an ISO `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, LoadError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| LoadError::date(s, e))
}

/// Parse an optional `HH:MM:SS` time.
pub fn parse_time(s: Option<&str>) -> Result<Option<ServiceTime>, LoadError> {
    s.map(|s| ServiceTime::parse_hms(s).map_err(|e| LoadError::time(s, e)))
        .transpose()
}

fn add_trip(builder: &mut TransitDataBuilder, dto: &TripDto) -> Result<(), LoadError> {
    let stops: &Stops = builder.stops();
    let n = dto.stop_times.len();
    let mut stop_ids = Vec::with_capacity(n);
    let mut pickups = Vec::with_capacity(n);
    let mut dropoffs = Vec::with_capacity(n);
    let mut arrivals = Vec::with_capacity(n);
    let mut departures = Vec::with_capacity(n);

    for st in &dto.stop_times {
        let id = StopId::new(&st.stop_id);
        if !stops.contains(&id) {
            return Err(LoadError::UnknownStop(id));
        }
        let arrival = parse_time(st.arrival.as_deref())?;
        let departure = parse_time(st.departure.as_deref())?;
        let (Some(arrival), Some(departure)) = (arrival.or(departure), departure.or(arrival)) else {
            return Err(LoadError::InvalidTime {
                value: String::new(),
                reason: format!("stop {} has neither arrival nor departure", st.stop_id),
            });
        };
        stop_ids.push(id);
        pickups.push(PickDrop::from_gtfs(st.pickup_type));
        dropoffs.push(PickDrop::from_gtfs(st.drop_off_type));
        arrivals.push(arrival);
        departures.push(departure);
    }

    let schedule_error = |source| LoadError::Schedule {
        trip: dto.id.clone(),
        source,
    };
    let stop_pattern = StopPattern::new(stop_ids, pickups, dropoffs).map_err(schedule_error)?;
    let trip = Trip::new(dto.id.as_str().into(), &dto.route_id, &dto.service_id)
        .with_wheelchair_accessible(dto.wheelchair_accessible)
        .with_bikes_allowed(dto.bikes_allowed);

    if dto.frequencies.is_empty() {
        builder
            .add_trip(trip, stop_pattern, arrivals, departures)
            .map_err(schedule_error)?;
    } else {
        let entries = dto
            .frequencies
            .iter()
            .map(|f| convert_frequency(f, &dto.id))
            .collect::<Result<Vec<_>, _>>()?;
        builder
            .add_frequency_trip(trip, stop_pattern, arrivals, departures, entries)
            .map_err(schedule_error)?;
    }
    Ok(())
}

fn convert_frequency(dto: &FrequencyDto, trip: &str) -> Result<FrequencyEntry, LoadError> {
    let start = ServiceTime::parse_hms(&dto.start).map_err(|e| LoadError::time(&dto.start, e))?;
    let end = ServiceTime::parse_hms(&dto.end).map_err(|e| LoadError::time(&dto.end, e))?;
    FrequencyEntry::new(start, end, dto.headway_secs, dto.exact_times).map_err(|source| {
        LoadError::Schedule {
            trip: trip.to_string(),
            source,
        }
    })
}
