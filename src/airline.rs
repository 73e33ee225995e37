// Carrier code → display name resolution.
//
// Priority: marketing-carrier names across all indexed segments, then
// operating-carrier names, then a bounded deep search over the remaining
// reference structure, then the formatted-code fallback.

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{get_path, str_at, unwrap_value};
use crate::reference_index::ReferenceIndex;

// The deep search skips the bulk segment/flight/airport maps and stops at a
// fixed depth so worst-case cost stays predictable.
const MAX_SEARCH_DEPTH: u32 = 16;

pub fn resolve_airline_name(code: &str, index: &ReferenceIndex) -> String {
    if code.is_empty() {
        warn!("empty airline code, using fallback name");
        return fallback_name(code);
    }

    for carrier_field in ["MarketingCarrier", "OperatingCarrier"] {
        for segment in index.segments.values() {
            if let Some(name) = carrier_name_if_match(segment, carrier_field, code) {
                return name;
            }
        }
    }

    for category in [
        &index.origin_destinations,
        &index.price_classes,
        &index.penalties,
        &index.carry_on_allowances,
        &index.checked_bag_allowances,
    ] {
        for entry in category.values() {
            if let Some(name) = search_carrier(entry, code, 0) {
                debug!(code, name, "airline name found via deep search");
                return name;
            }
        }
    }

    warn!(code, "airline name not found in reference data");
    fallback_name(code)
}

fn fallback_name(code: &str) -> String {
    format!("Airline {code}")
}

fn carrier_name_if_match(node: &Value, carrier_field: &str, code: &str) -> Option<String> {
    let carrier = get_path(node, &[carrier_field])?;
    let matches = get_path(carrier, &["AirlineID"])
        .and_then(unwrap_value)
        .map(|id| id == code)
        .unwrap_or(false)
        || str_at(carrier, &["AirlineCode"]) == Some(code);
    if matches {
        str_at(carrier, &["Name"]).map(str::to_string)
    } else {
        None
    }
}

fn search_carrier(node: &Value, code: &str, depth: u32) -> Option<String> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match node {
        Value::Object(map) => {
            for carrier_field in ["MarketingCarrier", "OperatingCarrier"] {
                if let Some(name) = carrier_name_if_match(node, carrier_field, code) {
                    return Some(name);
                }
            }
            map.values().find_map(|child| search_carrier(child, code, depth + 1))
        }
        Value::Array(items) => items
            .iter()
            .find_map(|item| search_carrier(item, code, depth + 1)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build_index(response: Value) -> ReferenceIndex {
        ReferenceIndex::build(&response)
    }

    #[test]
    fn marketing_carrier_wins_over_operating() {
        let index = build_index(json!({
            "DataLists": {"FlightSegmentList": {"FlightSegment": [
                {
                    "SegmentKey": "S1",
                    "OperatingCarrier": {"AirlineID": {"value": "EK"}, "Name": "Operated by Emirates"}
                },
                {
                    "SegmentKey": "S2",
                    "MarketingCarrier": {"AirlineID": {"value": "EK"}, "Name": "Emirates"}
                }
            ]}}
        }));
        assert_eq!(resolve_airline_name("EK", &index), "Emirates");
    }

    #[test]
    fn falls_back_to_operating_carrier() {
        let index = build_index(json!({
            "DataLists": {"FlightSegmentList": {"FlightSegment": [{
                "SegmentKey": "S1",
                "MarketingCarrier": {"AirlineID": {"value": "KQ"}, "Name": "Kenya Airways"},
                "OperatingCarrier": {"AirlineID": {"value": "WY"}, "Name": "Oman Air"}
            }]}}
        }));
        assert_eq!(resolve_airline_name("WY", &index), "Oman Air");
    }

    #[test]
    fn deep_search_finds_carrier_outside_segments() {
        let index = build_index(json!({
            "DataLists": {"PenaltyList": {"Penalty": [{
                "ObjectKey": "P1",
                "Nested": {"Deeper": {
                    "MarketingCarrier": {"AirlineID": {"value": "QR"}, "Name": "Qatar Airways"}
                }}
            }]}}
        }));
        assert_eq!(resolve_airline_name("QR", &index), "Qatar Airways");
    }

    #[test]
    fn unknown_code_formats_fallback() {
        let index = build_index(json!({}));
        assert_eq!(resolve_airline_name("ZZ", &index), "Airline ZZ");
        assert_eq!(resolve_airline_name("", &index), "Airline ");
    }

    #[test]
    fn airline_code_field_is_also_matched() {
        let index = build_index(json!({
            "DataLists": {"PriceClassList": {"PriceClass": [{
                "ObjectKey": "PC1",
                "OperatingCarrier": {"AirlineCode": "ET", "Name": "Ethiopian Airlines"}
            }]}}
        }));
        assert_eq!(resolve_airline_name("ET", &index), "Ethiopian Airlines");
    }
}
