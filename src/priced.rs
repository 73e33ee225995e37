// Multi-passenger-type aggregation over a flight-price response.
//
// Unlike the tolerant air-shopping path, this one assumes an
// already-validated document: the two top-level keys must be present or the
// call fails. Segments are reached through a three-level indirection
// (offer → origin-destination references → flight references → segment
// keys) and one record is emitted per distinct (passenger type, traveler
// count) grouping per offer-price block.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::{get_path, list_at, str_at, unwrap_number, unwrap_value};
use crate::duration::{format_minutes, parse_iso_duration};
use crate::fare_rules::{all_component_penalty_refs, penalty_summary, resolve_baggage, BaggageAllowance, PenaltySummary};
use crate::reference_index::ReferenceIndex;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("missing required key: {0}")]
    MissingKey(&'static str),
}

#[derive(Debug, Clone, Serialize)]
pub struct PricedSegment {
    pub airline_name: String,
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: String,
    pub departure_time: String,
    pub arrival_date: String,
    pub arrival_time: String,
    pub flight_duration: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingBlock {
    pub base_fare_per_traveler: f64,
    pub taxes_per_traveler: f64,
    pub discount_per_traveler: f64,
    pub total_price_per_traveler: f64,
    pub currency: String,
    pub traveler_count: usize,
    pub total_base_fare: f64,
    pub total_taxes: f64,
    pub total_discount: f64,
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PtcTotal {
    pub passenger_type: String,
    pub traveler_count: usize,
    pub price_per_ptc: f64,
    pub currency: String,
    pub total_amount: f64,
}

/// One record per distinct traveler grouping per offer-price block.
#[derive(Debug, Clone, Serialize)]
pub struct PricedFareRecord {
    pub segments: Vec<PricedSegment>,
    pub fare_basis: String,
    pub passenger_type: String,
    pub traveler_count: usize,
    pub baggage_allowance: BaggageAllowance,
    pub pricing: PricingBlock,
    pub penalties: PenaltySummary,
    // Expiration keys are omitted entirely when the source has no
    // TimeLimits entry for them, never serialized as null.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_expiration_utc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_expiration_utc: Option<String>,
    pub total_amount_per_ptc: PtcTotal,
}

/// Transforms a flight-price response into per-passenger-type fare records.
pub fn transform_priced(response: &Value) -> Result<Vec<PricedFareRecord>, TransformError> {
    if get_path(response, &["DataLists"]).is_none() {
        return Err(TransformError::MissingKey("DataLists"));
    }
    if get_path(response, &["PricedFlightOffers"]).is_none() {
        return Err(TransformError::MissingKey("PricedFlightOffers"));
    }

    let index = ReferenceIndex::build(response);
    let mut records = Vec::new();

    for offer in list_at(response, &["PricedFlightOffers", "PricedFlightOffer"]) {
        let offer_expiry =
            str_at(offer, &["TimeLimits", "OfferExpiration", "DateTime"]).map(str::to_string);
        let payment_expiry = str_at(offer, &["TimeLimits", "PaymentTimeLimit", "DateTime"])
            .or_else(|| str_at(offer, &["TimeLimits", "Payment", "DateTime"]))
            .map(str::to_string);

        for price_block in list_at(offer, &["OfferPrice"]) {
            let requested_date = get_path(price_block, &["RequestedDate"]).unwrap_or(&Value::Null);
            let price_detail = get_path(requested_date, &["PriceDetail"]).unwrap_or(&Value::Null);
            let total_node = get_path(price_detail, &["TotalAmount", "SimpleCurrencyPrice"])
                .unwrap_or(&Value::Null);
            let currency = str_at(total_node, &["Code"]).unwrap_or("").to_string();
            let total_per_traveler = unwrap_number(total_node);

            let segments = resolve_segment_chain(requested_date, &index);

            let components = list_at(price_block, &["FareDetail", "FareComponent"]);
            let fare_basis = components
                .first()
                .and_then(|c| str_at(c, &["FareBasis", "FareBasisCode", "Code"]))
                .unwrap_or("")
                .to_string();

            let penalty_refs = all_component_penalty_refs(price_block);
            let penalties = penalty_summary(&penalty_refs, &index);

            let base = get_path(price_detail, &["BaseAmount"])
                .map(unwrap_number)
                .unwrap_or(0.0);
            let taxes = get_path(price_detail, &["Taxes", "Total"])
                .map(unwrap_number)
                .unwrap_or(0.0);
            let discount: f64 = list_at(price_detail, &["Discount"])
                .iter()
                .map(|d| {
                    get_path(d, &["DiscountAmount"])
                        .map(unwrap_number)
                        .unwrap_or(0.0)
                })
                .sum();

            let mut seen: HashSet<(String, usize)> = HashSet::new();
            for assoc in list_at(requested_date, &["Associations"]) {
                let traveler_refs: Vec<&str> =
                    list_at(assoc, &["AssociatedTraveler", "TravelerReferences"])
                        .into_iter()
                        .filter_map(Value::as_str)
                        .collect();
                let Some(first_ref) = traveler_refs.first() else {
                    warn!("association without traveler references, skipping");
                    continue;
                };
                let Some(passenger_type) = index.travelers.get(*first_ref).cloned() else {
                    warn!(traveler_ref = first_ref, "unknown traveler reference, skipping");
                    continue;
                };
                let count = traveler_refs.len();
                if !seen.insert((passenger_type.clone(), count)) {
                    debug!(passenger_type, count, "duplicate traveler grouping suppressed");
                    continue;
                }

                let baggage_allowance = resolve_baggage(assoc, &index);
                let count_f = count as f64;

                records.push(PricedFareRecord {
                    segments: segments.clone(),
                    fare_basis: fare_basis.clone(),
                    passenger_type: passenger_type.clone(),
                    traveler_count: count,
                    baggage_allowance,
                    pricing: PricingBlock {
                        base_fare_per_traveler: base,
                        taxes_per_traveler: taxes,
                        discount_per_traveler: discount,
                        total_price_per_traveler: total_per_traveler,
                        currency: currency.clone(),
                        traveler_count: count,
                        total_base_fare: base * count_f,
                        total_taxes: taxes * count_f,
                        total_discount: discount * count_f,
                        total_price: total_per_traveler * count_f,
                    },
                    penalties: penalties.clone(),
                    offer_expiration_utc: offer_expiry.clone(),
                    payment_expiration_utc: payment_expiry.clone(),
                    total_amount_per_ptc: PtcTotal {
                        passenger_type,
                        traveler_count: count,
                        price_per_ptc: total_per_traveler,
                        currency: currency.clone(),
                        total_amount: total_per_traveler * count_f,
                    },
                });
            }
        }
    }

    debug!(count = records.len(), "transformed priced fare records");
    Ok(records)
}

/// Walks offer → origin-destination references → flight references →
/// segment keys, resolving each hop against the index.
fn resolve_segment_chain(requested_date: &Value, index: &ReferenceIndex) -> Vec<PricedSegment> {
    let associations = list_at(requested_date, &["Associations"]);
    let Some(first_assoc) = associations.first() else {
        return Vec::new();
    };

    let mut segments = Vec::new();
    for od_ref in list_at(first_assoc, &["ApplicableFlight", "OriginDestinationReferences"]) {
        let Some(od_key) = od_ref.as_str() else { continue };
        let Some(od) = index.origin_destinations.get(od_key) else {
            warn!(od_key, "origin-destination reference not found");
            continue;
        };
        for flight_ref in list_at(od, &["FlightReferences", "value"]) {
            let Some(flight_key) = flight_ref.as_str() else { continue };
            for segment_key in index.flight_segment_keys(flight_key) {
                let Some(raw) = index.segments.get(&segment_key) else {
                    warn!(segment_key, "segment reference not found");
                    continue;
                };
                segments.push(priced_segment(raw));
            }
        }
    }
    segments
}

fn priced_segment(raw: &Value) -> PricedSegment {
    let airline_id = get_path(raw, &["MarketingCarrier", "AirlineID"])
        .and_then(unwrap_value)
        .unwrap_or("");
    let flight_number = get_path(raw, &["MarketingCarrier", "FlightNumber"])
        .and_then(unwrap_value)
        .unwrap_or("");

    let dep_date = str_at(raw, &["Departure", "Date"]).unwrap_or("");
    let arr_date = str_at(raw, &["Arrival", "Date"]).unwrap_or("");

    PricedSegment {
        airline_name: str_at(raw, &["MarketingCarrier", "Name"]).unwrap_or("").to_string(),
        flight_number: format!("{airline_id}{flight_number}"),
        origin: get_path(raw, &["Departure", "AirportCode"])
            .and_then(unwrap_value)
            .unwrap_or("")
            .to_string(),
        destination: get_path(raw, &["Arrival", "AirportCode"])
            .and_then(unwrap_value)
            .unwrap_or("")
            .to_string(),
        departure_date: date_part(dep_date),
        departure_time: str_at(raw, &["Departure", "Time"]).unwrap_or("").to_string(),
        arrival_date: date_part(arr_date),
        arrival_time: str_at(raw, &["Arrival", "Time"]).unwrap_or("").to_string(),
        flight_duration: display_duration(
            str_at(raw, &["FlightDetail", "FlightDuration", "Value"]).unwrap_or(""),
        ),
    }
}

fn date_part(date: &str) -> String {
    date.split('T').next().unwrap_or("").to_string()
}

/// Renders "PT{H}H{M}M" as "{h}h {m}m"; anything else passes through
/// verbatim (some carriers already send display text here).
fn display_duration(raw: &str) -> String {
    let is_full_form = raw
        .strip_prefix("PT")
        .map(|body| body.contains('H') && body.ends_with('M'))
        .unwrap_or(false);
    if is_full_form {
        format_minutes(parse_iso_duration(raw))
    } else {
        raw.to_string()
    }
}

/// Owner/airline code extraction used by the downstream booking flow; reads
/// the priced offer's Owner with the same tolerance as the transformer.
pub fn extract_owner_code(flight_price_response: &Value) -> Option<String> {
    for path in [
        &["FlightPriceRS", "PricedOffer", "Owner"][..],
        &["PricedOffer", "Owner"][..],
    ] {
        if let Some(code) = get_path(flight_price_response, path).and_then(unwrap_value) {
            return Some(code.to_string());
        }
    }
    warn!("no Owner code found in flight price response");
    None
}
