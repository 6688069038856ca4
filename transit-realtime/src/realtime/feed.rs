//! JSON realtime feed messages.
//!
//! One message per line. Each message carries the updates of one feed and
//! says whether it replaces everything previously received from that feed.

use serde::Deserialize;

use crate::domain::{StopId, TripId};
use crate::loader::{LoadError, parse_date, parse_time};

use super::call::{EstimatedCall, JourneyUpdate};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMessageDto {
    pub feed_id: String,
    /// Realtime data of this feed not repeated in this message is dropped.
    #[serde(default)]
    pub full_dataset: bool,
    #[serde(default)]
    pub updates: Vec<JourneyUpdateDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyUpdateDto {
    pub trip_id: Option<String>,
    /// ISO date (`YYYY-MM-DD`) of the service day the trip runs on.
    pub service_date: String,
    pub route_id: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub prediction_inaccurate: bool,
    #[serde(default)]
    pub extra_journey: bool,
    pub wheelchair_accessible: Option<bool>,
    #[serde(default)]
    pub calls: Vec<CallDto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDto {
    pub stop_id: String,
    /// One-based position in the journey's stop sequence.
    pub order: Option<usize>,
    pub aimed_arrival: Option<String>,
    pub expected_arrival: Option<String>,
    pub actual_arrival: Option<String>,
    pub aimed_departure: Option<String>,
    pub expected_departure: Option<String>,
    pub actual_departure: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub arrival_cancelled: bool,
    #[serde(default)]
    pub departure_cancelled: bool,
    #[serde(default)]
    pub prediction_inaccurate: bool,
}

/// Parse one line of a JSON-lines feed.
pub fn parse_feed_message(line: &str) -> Result<FeedMessageDto, LoadError> {
    Ok(serde_json::from_str(line)?)
}

impl TryFrom<&JourneyUpdateDto> for JourneyUpdate {
    type Error = LoadError;

    fn try_from(dto: &JourneyUpdateDto) -> Result<Self, Self::Error> {
        let calls = dto
            .calls
            .iter()
            .map(EstimatedCall::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(JourneyUpdate {
            trip_id: dto.trip_id.as_deref().map(TripId::new),
            service_date: parse_date(&dto.service_date)?,
            route_id: dto.route_id.clone(),
            cancelled: dto.cancelled,
            prediction_inaccurate: dto.prediction_inaccurate,
            extra_journey: dto.extra_journey,
            wheelchair_accessible: dto.wheelchair_accessible,
            calls,
        })
    }
}

impl TryFrom<&CallDto> for EstimatedCall {
    type Error = LoadError;

    fn try_from(dto: &CallDto) -> Result<Self, Self::Error> {
        let order = dto
            .order
            .map(|order| {
                order.checked_sub(1).ok_or_else(|| LoadError::InvalidField {
                    field: "order",
                    value: order.to_string(),
                })
            })
            .transpose()?;
        Ok(EstimatedCall {
            stop_id: StopId::new(&dto.stop_id),
            order,
            aimed_arrival: parse_time(dto.aimed_arrival.as_deref())?,
            expected_arrival: parse_time(dto.expected_arrival.as_deref())?,
            actual_arrival: parse_time(dto.actual_arrival.as_deref())?,
            aimed_departure: parse_time(dto.aimed_departure.as_deref())?,
            expected_departure: parse_time(dto.expected_departure.as_deref())?,
            actual_departure: parse_time(dto.actual_departure.as_deref())?,
            cancelled: dto.cancelled,
            arrival_cancelled: dto.arrival_cancelled,
            departure_cancelled: dto.departure_cancelled,
            prediction_inaccurate: dto.prediction_inaccurate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ServiceTime;
    use chrono::NaiveDate;

    const MESSAGE: &str = r#"{"feedId": "F", "fullDataset": true, "updates": [
        {"tripId": "T1", "serviceDate": "2024-03-15", "calls": [
            {"stopId": "A", "order": 1, "actualDeparture": "08:02:00"},
            {"stopId": "B", "order": 2, "expectedArrival": "08:12:30", "departureCancelled": true}
        ]},
        {"serviceDate": "2024-03-15", "routeId": "R1", "cancelled": true}
    ]}"#;

    #[test]
    fn parse_message() {
        let msg = parse_feed_message(MESSAGE).unwrap();
        assert_eq!(msg.feed_id, "F");
        assert!(msg.full_dataset);
        assert_eq!(msg.updates.len(), 2);
    }

    #[test]
    fn convert_update() {
        let msg = parse_feed_message(MESSAGE).unwrap();
        let update = JourneyUpdate::try_from(&msg.updates[0]).unwrap();
        assert_eq!(update.trip_id, Some(TripId::new("T1")));
        assert_eq!(
            update.service_date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(update.calls[0].order, Some(0));
        assert_eq!(update.calls[0].actual_departure, Some(ServiceTime::hms(8, 2, 0)));
        assert_eq!(update.calls[1].expected_arrival, Some(ServiceTime::hms(8, 12, 30)));
        assert!(update.calls[1].departure_cancelled);
        assert!(!update.calls[1].arrival_cancelled);
    }

    #[test]
    fn anonymous_cancellation() {
        let msg = parse_feed_message(MESSAGE).unwrap();
        let update = JourneyUpdate::try_from(&msg.updates[1]).unwrap();
        assert_eq!(update.trip_id, None);
        assert_eq!(update.route_id.as_deref(), Some("R1"));
        assert!(update.cancelled);
        assert!(update.calls.is_empty());
    }

    #[test]
    fn zero_order_rejected() {
        let dto: CallDto = serde_json::from_str(r#"{"stopId": "A", "order": 0}"#).unwrap();
        assert!(matches!(
            EstimatedCall::try_from(&dto),
            Err(LoadError::InvalidField { field: "order", .. })
        ));
    }

    #[test]
    fn bad_time_rejected() {
        let dto: CallDto =
            serde_json::from_str(r#"{"stopId": "A", "expectedArrival": "8am"}"#).unwrap();
        assert!(matches!(
            EstimatedCall::try_from(&dto),
            Err(LoadError::InvalidTime { .. })
        ));
    }

    #[test]
    fn malformed_line_is_json_error() {
        assert!(matches!(parse_feed_message("{"), Err(LoadError::Json(_))));
    }
}
