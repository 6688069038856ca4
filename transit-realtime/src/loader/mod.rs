//! Static network loading from JSON.

mod convert;
mod error;
mod types;

use std::path::Path;

pub use convert::{convert_network, parse_date, parse_time};
pub use error::LoadError;
pub use types::{FrequencyDto, NetworkDto, ServiceDatesDto, StopDto, StopTimeDto, TripDto};

use crate::network::TransitData;

/// Read and convert a static network JSON file.
pub fn load_network(path: impl AsRef<Path>, index_threshold: usize) -> Result<TransitData, LoadError> {
    let contents = std::fs::read_to_string(path)?;
    let dto: NetworkDto = serde_json::from_str(&contents)?;
    convert_network(&dto, index_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"feedId": "F",
                "stops": [{{"id": "A"}}, {{"id": "B"}}],
                "trips": [{{"id": "T", "routeId": "R", "serviceId": "S", "stopTimes": [
                    {{"stopId": "A", "departure": "10:00:00"}},
                    {{"stopId": "B", "arrival": "10:05:00"}}
                ]}}]}}"#
        )
        .unwrap();
        let data = load_network(file.path(), 16).unwrap();
        assert_eq!(data.feed_id(), "F");
        assert_eq!(data.trip_count(), 1);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_network("/nonexistent/network.json", 16).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn malformed_json_is_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(matches!(load_network(file.path(), 16), Err(LoadError::Json(_))));
    }
}
