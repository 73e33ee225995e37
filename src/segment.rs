// Flight-segment resolution against the reference index.
//
// Airlines encode departure/arrival timestamps inconsistently: some put a
// full datetime in the Date field, some split Date and Time, some omit the
// time entirely. The resolver normalizes all of that into one canonical
// datetime plus a padded HH:MM:SS time-of-day.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::document::{get_path, str_at, unwrap_value};
use crate::reference_index::ReferenceIndex;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEndpoint {
    pub airport: String,
    pub datetime: String,
    pub time: Option<String>,
    pub terminal: Option<String>,
    pub airport_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
    pub flight_number: String,
    pub aircraft: Aircraft,
    pub airline_name: String,
    /// Raw ISO duration from the document ("PT2H45M"), "N/A" when absent.
    pub duration: String,
}

/// Resolves a segment reference. `None` when the key is not indexed; the
/// caller logs and skips without aborting the transformation.
pub fn resolve_segment(segment_key: &str, index: &ReferenceIndex) -> Option<Segment> {
    let Some(raw) = index.segments.get(segment_key) else {
        warn!(segment_key, "segment reference not found in index");
        return None;
    };
    Some(transform_segment(raw, index))
}

/// Normalizes an already-looked-up raw segment node.
pub fn transform_segment(raw: &Value, index: &ReferenceIndex) -> Segment {
    let departure = endpoint(raw, "Departure", index);
    let arrival = endpoint(raw, "Arrival", index);

    let flight_number = get_path(raw, &["MarketingCarrier", "FlightNumber"])
        .and_then(unwrap_value)
        .unwrap_or("001")
        .to_string();

    let aircraft_code = get_path(raw, &["Equipment", "AircraftCode"])
        .and_then(unwrap_value)
        .unwrap_or("Unknown")
        .to_string();

    let airline_name = str_at(raw, &["OperatingCarrier", "Name"])
        .unwrap_or("Unknown Airline")
        .to_string();

    let duration = str_at(raw, &["FlightDetail", "FlightDuration", "Value"])
        .unwrap_or("N/A")
        .to_string();

    Segment {
        departure,
        arrival,
        flight_number,
        aircraft: Aircraft {
            code: aircraft_code,
            name: "Aircraft".to_string(),
        },
        airline_name,
        duration,
    }
}

fn endpoint(raw: &Value, side: &str, index: &ReferenceIndex) -> SegmentEndpoint {
    let node = get_path(raw, &[side]).unwrap_or(&Value::Null);
    let code = get_path(node, &["AirportCode"])
        .and_then(unwrap_value)
        .unwrap_or("")
        .to_string();
    let info = index.airport(&code);

    let date_raw = str_at(node, &["Date"]).unwrap_or("");
    let time_raw = str_at(node, &["Time"]).unwrap_or("");

    let datetime = combine_datetime(date_raw, time_raw);
    let time = time_of_day(time_raw, &datetime);

    SegmentEndpoint {
        airport: code,
        datetime,
        time,
        terminal: info.terminal,
        airport_name: info.name,
    }
}

/// Canonical datetime, in priority order: combined value already in the date
/// field, date + "T" + time, date with a defaulted midnight time, empty.
fn combine_datetime(date: &str, time: &str) -> String {
    if date.contains('T') {
        date.to_string()
    } else if !date.is_empty() && !time.is_empty() {
        format!("{date}T{time}")
    } else if !date.is_empty() {
        format!("{date}T00:00")
    } else {
        String::new()
    }
}

/// Time-of-day, preferring the explicit Time field (padded to HH:MM:SS) and
/// falling back to the datetime's time part with any sub-second fraction
/// stripped.
fn time_of_day(time: &str, datetime: &str) -> Option<String> {
    let trimmed = time.trim();
    if !trimmed.is_empty() {
        return Some(match trimmed.split(':').count() {
            2 => format!("{trimmed}:00"),
            _ => trimmed.to_string(),
        });
    }

    let (_, after) = datetime.split_once('T')?;
    let clean = after.split('.').next().unwrap_or(after);
    Some(clean.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn index_with_segment(segment: Value) -> ReferenceIndex {
        ReferenceIndex::build(&json!({
            "DataLists": {"FlightSegmentList": {"FlightSegment": [segment]}}
        }))
    }

    #[test_case("2025-09-01T14:30:00", "", "2025-09-01T14:30:00"; "combined date field wins")]
    #[test_case("2025-09-01T14:30:00", "15:00", "2025-09-01T14:30:00"; "combined beats separate time")]
    #[test_case("2025-09-01", "14:30", "2025-09-01T14:30"; "separate fields concatenated")]
    #[test_case("2025-09-01", "", "2025-09-01T00:00"; "date only defaults midnight")]
    #[test_case("", "", ""; "nothing yields empty")]
    fn datetime_priority_chain(date: &str, time: &str, expected: &str) {
        assert_eq!(combine_datetime(date, time), expected);
    }

    #[test_case("14:30", "ignored", Some("14:30:00"); "pads missing seconds")]
    #[test_case("14:30:45", "ignored", Some("14:30:45"); "keeps full time")]
    #[test_case("", "2025-09-01T14:30:00.500", Some("14:30:00"); "strips fraction from datetime")]
    #[test_case("", "2025-09-01", None; "no time part available")]
    fn time_of_day_priority(time: &str, datetime: &str, expected: Option<&str>) {
        assert_eq!(time_of_day(time, datetime), expected.map(str::to_string));
    }

    #[test]
    fn resolves_full_segment() {
        let index = index_with_segment(json!({
            "SegmentKey": "SEG1",
            "Departure": {
                "AirportCode": {"value": "DXB"},
                "Date": "2025-09-01",
                "Time": "14:30"
            },
            "Arrival": {
                "AirportCode": {"value": "LHR"},
                "Date": "2025-09-01T18:45:00"
            },
            "MarketingCarrier": {"FlightNumber": {"value": "203"}},
            "OperatingCarrier": {"Name": "Emirates"},
            "Equipment": {"AircraftCode": "388"},
            "FlightDetail": {"FlightDuration": {"Value": "PT7H15M"}}
        }));

        let segment = resolve_segment("SEG1", &index).unwrap();
        assert_eq!(segment.departure.airport, "DXB");
        assert_eq!(segment.departure.datetime, "2025-09-01T14:30");
        assert_eq!(segment.departure.time.as_deref(), Some("14:30:00"));
        assert_eq!(segment.arrival.datetime, "2025-09-01T18:45:00");
        assert_eq!(segment.arrival.time.as_deref(), Some("18:45:00"));
        assert_eq!(segment.flight_number, "203");
        assert_eq!(segment.aircraft.code, "388");
        assert_eq!(segment.airline_name, "Emirates");
        assert_eq!(segment.duration, "PT7H15M");
    }

    #[test]
    fn missing_key_degrades_to_none() {
        let index = index_with_segment(json!({"SegmentKey": "SEG1"}));
        assert!(resolve_segment("SEG9", &index).is_none());
    }
}
