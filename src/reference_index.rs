// One-pass indexing of the shared lookup lists in an NDC response.
//
// Everything downstream (segment resolution, baggage, penalties, airline
// names) consults these maps instead of re-scanning the document. A missing
// or malformed list yields an empty map for that category, never an error;
// callers are expected to degrade when a referenced key is absent.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{get_path, list_at, str_at, unwrap_value};

/// Airport display data harvested from the origin-destination lists.
#[derive(Debug, Clone, Default)]
pub struct AirportInfo {
    pub code: String,
    pub name: String,
    pub terminal: Option<String>,
}

/// Key → object maps for every reference list the transformer resolves
/// against. Built once per response and read-only afterwards.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    pub flights: HashMap<String, Value>,
    pub segments: HashMap<String, Value>,
    pub origin_destinations: HashMap<String, Value>,
    pub airports: HashMap<String, AirportInfo>,
    pub price_classes: HashMap<String, Value>,
    pub penalties: HashMap<String, Value>,
    pub carry_on_allowances: HashMap<String, Value>,
    pub checked_bag_allowances: HashMap<String, Value>,
    /// AnonymousTraveler ObjectKey → passenger type code.
    pub travelers: HashMap<String, String>,
}

impl ReferenceIndex {
    pub fn build(response: &Value) -> Self {
        let mut index = ReferenceIndex::default();
        let data_lists = get_path(response, &["DataLists"]).unwrap_or(&Value::Null);

        index_keyed_list(
            &mut index.flights,
            list_at(data_lists, &["FlightList", "Flight"]),
            "FlightKey",
        );
        index_keyed_list(
            &mut index.segments,
            list_at(data_lists, &["FlightSegmentList", "FlightSegment"]),
            "SegmentKey",
        );

        // Air-shopping responses carry the OD list at the root; flight-price
        // responses nest it under DataLists.
        for container in [response, data_lists] {
            for od in list_at(container, &["OriginDestinationList", "OriginDestination"]) {
                if let Some(key) = str_at(od, &["OriginDestinationKey"]) {
                    index.origin_destinations.insert(key.to_string(), od.clone());
                }
                index.harvest_airport(od, "Departure");
                index.harvest_airport(od, "Arrival");
            }
        }

        // A price-class-like list appears under either of two names; prefer
        // PriceClassList when both are present.
        let price_classes = list_at(data_lists, &["PriceClassList", "PriceClass"]);
        if !price_classes.is_empty() {
            index_keyed_list(&mut index.price_classes, price_classes, "ObjectKey");
        } else {
            index_keyed_list(
                &mut index.price_classes,
                list_at(data_lists, &["ServiceList", "Service"]),
                "ObjectKey",
            );
        }

        index_keyed_list(
            &mut index.penalties,
            list_at(data_lists, &["PenaltyList", "Penalty"]),
            "ObjectKey",
        );
        index_keyed_list(
            &mut index.carry_on_allowances,
            list_at(data_lists, &["CarryOnAllowanceList", "CarryOnAllowance"]),
            "ListKey",
        );
        index_keyed_list(
            &mut index.checked_bag_allowances,
            list_at(data_lists, &["CheckedBagAllowanceList", "CheckedBagAllowance"]),
            "ListKey",
        );

        for traveler in list_at(data_lists, &["AnonymousTravelerList", "AnonymousTraveler"]) {
            let Some(key) = str_at(traveler, &["ObjectKey"]) else {
                warn!("anonymous traveler entry missing ObjectKey");
                continue;
            };
            if let Some(ptc) = get_path(traveler, &["PTC"]).and_then(unwrap_value) {
                index.travelers.insert(key.to_string(), ptc.to_string());
            }
        }

        debug!(
            flights = index.flights.len(),
            segments = index.segments.len(),
            origin_destinations = index.origin_destinations.len(),
            penalties = index.penalties.len(),
            "built reference index"
        );
        index
    }

    fn harvest_airport(&mut self, od: &Value, endpoint: &str) {
        let Some(node) = get_path(od, &[endpoint]) else {
            return;
        };
        let Some(code) = get_path(node, &["AirportCode"]).and_then(unwrap_value) else {
            return;
        };
        let name = str_at(node, &["AirportName"]).unwrap_or(code).to_string();
        let terminal = str_at(node, &["Terminal"]).map(str::to_string);
        self.airports.insert(
            code.to_string(),
            AirportInfo {
                code: code.to_string(),
                name,
                terminal,
            },
        );
    }

    /// Airport lookup that never fails: unknown codes come back with the
    /// code standing in for the name.
    pub fn airport(&self, code: &str) -> AirportInfo {
        self.airports.get(code).cloned().unwrap_or_else(|| AirportInfo {
            code: code.to_string(),
            name: code.to_string(),
            terminal: None,
        })
    }

    /// Segment keys referenced by a flight, in document order.
    pub fn flight_segment_keys(&self, flight_key: &str) -> Vec<String> {
        let Some(flight) = self.flights.get(flight_key) else {
            warn!(flight_key, "flight reference not found");
            return Vec::new();
        };
        match get_path(flight, &["SegmentReferences", "value"]) {
            Some(Value::Array(refs)) => refs
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(single)) => vec![single.clone()],
            _ => Vec::new(),
        }
    }
}

fn index_keyed_list(target: &mut HashMap<String, Value>, entries: Vec<&Value>, key_field: &str) {
    for entry in entries {
        match str_at(entry, &[key_field]) {
            Some(key) => {
                target.insert(key.to_string(), entry.clone());
            }
            None => warn!(key_field, "reference entry missing its key field"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_all_categories_and_tolerates_missing_lists() {
        let response = json!({
            "DataLists": {
                "FlightSegmentList": {
                    "FlightSegment": [
                        {"SegmentKey": "SEG1", "Departure": {}},
                        {"Departure": {}}
                    ]
                },
                "PenaltyList": {"Penalty": [{"ObjectKey": "PEN1"}]},
                "CarryOnAllowanceList": {"CarryOnAllowance": [{"ListKey": "CO1"}]},
                "AnonymousTravelerList": {
                    "AnonymousTraveler": [
                        {"ObjectKey": "T1", "PTC": {"value": "ADT"}}
                    ]
                }
            }
        });

        let index = ReferenceIndex::build(&response);
        assert_eq!(index.segments.len(), 1);
        assert!(index.segments.contains_key("SEG1"));
        assert_eq!(index.penalties.len(), 1);
        assert_eq!(index.carry_on_allowances.len(), 1);
        assert!(index.checked_bag_allowances.is_empty());
        assert!(index.flights.is_empty());
        assert_eq!(index.travelers.get("T1").map(String::as_str), Some("ADT"));
    }

    #[test]
    fn indexes_origin_destinations_from_root_and_data_lists() {
        let response = json!({
            "OriginDestinationList": {
                "OriginDestination": [{
                    "OriginDestinationKey": "OD1",
                    "Departure": {"AirportCode": "DXB", "AirportName": "Dubai Intl", "Terminal": "3"},
                    "Arrival": {"AirportCode": "LHR"}
                }]
            },
            "DataLists": {
                "OriginDestinationList": {
                    "OriginDestination": [{
                        "OriginDestinationKey": "OD2",
                        "Departure": {"AirportCode": {"value": "NBO"}},
                        "Arrival": {"AirportCode": {"value": "AMS"}}
                    }]
                }
            }
        });

        let index = ReferenceIndex::build(&response);
        assert!(index.origin_destinations.contains_key("OD1"));
        assert!(index.origin_destinations.contains_key("OD2"));

        let dxb = index.airport("DXB");
        assert_eq!(dxb.name, "Dubai Intl");
        assert_eq!(dxb.terminal.as_deref(), Some("3"));
        // Name defaults to the code when the list carries no AirportName.
        assert_eq!(index.airport("NBO").name, "NBO");
        // Unknown codes come back as a placeholder, not an error.
        assert_eq!(index.airport("XXX").code, "XXX");
    }

    #[test]
    fn prefers_price_class_list_over_service_list() {
        let response = json!({
            "DataLists": {
                "PriceClassList": {"PriceClass": [{"ObjectKey": "PC1"}]},
                "ServiceList": {"Service": [{"ObjectKey": "SVC1"}]}
            }
        });
        let index = ReferenceIndex::build(&response);
        assert!(index.price_classes.contains_key("PC1"));
        assert!(!index.price_classes.contains_key("SVC1"));

        let service_only = json!({
            "DataLists": {"ServiceList": {"Service": [{"ObjectKey": "SVC1"}]}}
        });
        let index = ReferenceIndex::build(&service_only);
        assert!(index.price_classes.contains_key("SVC1"));
    }

    #[test]
    fn flight_segment_keys_handles_list_and_scalar_refs() {
        let response = json!({
            "DataLists": {
                "FlightList": {
                    "Flight": [
                        {"FlightKey": "FL1", "SegmentReferences": {"value": ["S1", "S2"]}},
                        {"FlightKey": "FL2", "SegmentReferences": {"value": "S3"}}
                    ]
                }
            }
        });
        let index = ReferenceIndex::build(&response);
        assert_eq!(index.flight_segment_keys("FL1"), vec!["S1", "S2"]);
        assert_eq!(index.flight_segment_keys("FL2"), vec!["S3"]);
        assert!(index.flight_segment_keys("FL9").is_empty());
    }
}
