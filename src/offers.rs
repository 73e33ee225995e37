// Single-offer aggregation: one denormalized record per priced offer.
//
// The outer walk is tolerant by design: a malformed offer is dropped with a
// warning and the remaining offers still transform; a response without an
// offers group yields an empty list, never an error.

use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::airline::resolve_airline_name;
use crate::document::{format_amount, get_path, list_at, str_at, unwrap_value};
use crate::duration::{format_minutes, parse_iso_duration};
use crate::fare_rules::{
    extract_baggage_info, extract_penalties, fare_rules_from_penalties, BaggageInfo, FareRules,
    Penalty,
};
use crate::reference_index::ReferenceIndex;
use crate::segment::{resolve_segment, Segment, SegmentEndpoint};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirlineDetails {
    pub code: String,
    pub name: String,
    pub logo: String,
    pub flight_number: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub base_fare: f64,
    pub taxes: f64,
    pub fees: f64,
    pub total_price: f64,
    pub currency: String,
}

/// Flat, UI-ready flight offer produced by the single-offer path.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightOfferRecord {
    /// Display/dedup key: airline code, joined segment refs and price. Not
    /// guaranteed globally unique across airlines with identical routes and
    /// prices.
    pub id: String,
    pub airline: AirlineDetails,
    pub departure: SegmentEndpoint,
    pub arrival: SegmentEndpoint,
    pub duration: String,
    pub stops: usize,
    pub stop_details: Vec<String>,
    pub price: f64,
    pub currency: String,
    pub baggage: BaggageInfo,
    /// Raw penalty list, kept alongside the structured fare rules.
    pub penalties: Vec<Penalty>,
    pub fare_rules: FareRules,
    pub segments: Vec<Segment>,
    pub price_breakdown: PriceBreakdown,
}

/// Transforms an air-shopping response into denormalized offer records.
/// Structural failures never propagate: the result is a possibly empty list.
pub fn transform(response: &Value) -> Vec<FlightOfferRecord> {
    let Some(offers_group) = get_path(response, &["OffersGroup"]) else {
        warn!("response has no OffersGroup, returning no offers");
        return Vec::new();
    };

    let index = ReferenceIndex::build(response);
    let mut records = Vec::new();

    for airline_offer_group in list_at(offers_group, &["AirlineOffers"]) {
        let airline_code = get_path(airline_offer_group, &["Owner"])
            .and_then(unwrap_value)
            .unwrap_or("Unknown");

        for airline_offer in list_at(airline_offer_group, &["AirlineOffer"]) {
            let Some(priced_offer) = get_path(airline_offer, &["PricedOffer"]) else {
                warn!(airline_code, "airline offer without PricedOffer, skipping");
                continue;
            };
            match transform_single_offer(priced_offer, airline_code, &index, airline_offer) {
                Some(record) => records.push(record),
                None => warn!(airline_code, "offer dropped during transformation"),
            }
        }
    }

    debug!(count = records.len(), "transformed flight offers");
    records
}

fn transform_single_offer(
    priced_offer: &Value,
    airline_code: &str,
    index: &ReferenceIndex,
    airline_offer: &Value,
) -> Option<FlightOfferRecord> {
    let offer_prices = list_at(priced_offer, &["OfferPrice"]);
    // Only the first offer-price entry is processed; additional fare
    // combinations under one priced offer are not fanned out.
    let offer_price = *offer_prices.first()?;

    let (price, currency) = resolve_price(offer_price, airline_offer, priced_offer);

    // Segment references come from the offer-price associations, falling
    // back to priced-offer-level associations.
    let mut associations = list_at(offer_price, &["Associations"]);
    if associations.is_empty() {
        associations = list_at(priced_offer, &["Associations"]);
    }

    let mut segments = Vec::new();
    let mut segment_refs = Vec::new();
    for assoc in &associations {
        for seg_ref in list_at(assoc, &["ApplicableFlight", "FlightSegmentReference"]) {
            let Some(key) = str_at(seg_ref, &["ref"]) else {
                warn!("segment reference without ref key");
                continue;
            };
            segment_refs.push(key.to_string());
            if let Some(segment) = resolve_segment(key, index) {
                segments.push(segment);
            }
        }
    }

    if segments.is_empty() {
        warn!(airline_code, "no resolvable segments, dropping offer");
        return None;
    }

    let first = segments.first()?.clone();
    let last = segments.last()?.clone();

    let stops = segments.len().saturating_sub(1);
    let stop_details: Vec<String> = segments[1..]
        .iter()
        .map(|s| s.departure.airport.clone())
        .collect();

    let total_minutes: u32 = segments
        .iter()
        .map(|s| parse_iso_duration(&s.duration))
        .sum();
    let duration = if total_minutes > 0 {
        format_minutes(total_minutes)
    } else {
        wall_clock_duration(&first, &last)
    };

    let id = format!(
        "{}-{}-{}",
        airline_code,
        segment_refs.join("-"),
        format_amount(price)
    );

    let airline = AirlineDetails {
        code: airline_code.to_string(),
        name: resolve_airline_name(airline_code, index),
        logo: format!("/airlines/{}.png", airline_code.to_lowercase()),
        flight_number: format!("{}{}", airline_code, first.flight_number),
    };

    let baggage = extract_baggage_info(offer_price, index);
    let penalties = extract_penalties(priced_offer, index);
    let fare_rules = fare_rules_from_penalties(&penalties);
    let price_breakdown = build_price_breakdown(offer_price, airline_offer, priced_offer);

    Some(FlightOfferRecord {
        id,
        airline,
        departure: first.departure.clone(),
        arrival: last.arrival.clone(),
        duration,
        stops,
        stop_details,
        price,
        currency,
        baggage,
        penalties,
        fare_rules,
        segments,
        price_breakdown,
    })
}

/// Three-tier price fallback, tried in order; the first nonzero total wins.
/// When every tier is zero, the currency of the last present tier sticks.
fn resolve_price(offer_price: &Value, airline_offer: &Value, priced_offer: &Value) -> (f64, String) {
    let tiers: [(&str, Option<&Value>); 3] = [
        (
            "offer-price detail",
            get_path(
                offer_price,
                &["RequestedDate", "PriceDetail", "TotalAmount", "SimpleCurrencyPrice"],
            ),
        ),
        (
            "airline-offer total",
            get_path(airline_offer, &["TotalPrice", "SimpleCurrencyPrice"]),
        ),
        (
            "priced-offer total",
            get_path(priced_offer, &["TotalPrice", "SimpleCurrencyPrice"]),
        ),
    ];

    let mut currency = String::new();
    for (tier, node) in tiers {
        let Some(node) = node else { continue };
        let value = crate::document::unwrap_number(node);
        if let Some(code) = str_at(node, &["Code"]) {
            currency = code.to_string();
        }
        if value != 0.0 {
            debug!(tier, value, "price resolved");
            return (value, currency);
        }
    }
    (0.0, currency)
}

fn build_price_breakdown(
    offer_price: &Value,
    airline_offer: &Value,
    priced_offer: &Value,
) -> PriceBreakdown {
    let price_detail = get_path(offer_price, &["RequestedDate", "PriceDetail"])
        .filter(|pd| pd.as_object().map(|m| !m.is_empty()).unwrap_or(false));

    if let Some(detail) = price_detail {
        let total_node =
            get_path(detail, &["TotalAmount", "SimpleCurrencyPrice"]).unwrap_or(&Value::Null);
        return PriceBreakdown {
            base_fare: get_path(detail, &["BaseAmount"])
                .map(crate::document::unwrap_number)
                .unwrap_or(0.0),
            taxes: get_path(detail, &["Taxes", "Total"])
                .map(crate::document::unwrap_number)
                .unwrap_or(0.0),
            fees: 0.0,
            total_price: crate::document::unwrap_number(total_node),
            currency: str_at(total_node, &["Code"]).unwrap_or("USD").to_string(),
        };
    }

    // No detailed breakdown below the top tier: the resolved total doubles
    // as the base fare.
    for source in [airline_offer, priced_offer] {
        if let Some(total) = get_path(source, &["TotalPrice", "SimpleCurrencyPrice"]) {
            let value = crate::document::unwrap_number(total);
            return PriceBreakdown {
                base_fare: value,
                taxes: 0.0,
                fees: 0.0,
                total_price: value,
                currency: str_at(total, &["Code"]).unwrap_or("USD").to_string(),
            };
        }
    }

    PriceBreakdown {
        base_fare: 0.0,
        taxes: 0.0,
        fees: 0.0,
        total_price: 0.0,
        currency: "USD".to_string(),
    }
}

/// Wall-clock fallback for the aggregate duration: subtract first departure
/// from last arrival. Yields "N/A" when either datetime is unparseable.
fn wall_clock_duration(first: &Segment, last: &Segment) -> String {
    let Some(dep) = parse_datetime(&first.departure.datetime) else {
        return "N/A".to_string();
    };
    let Some(arr) = parse_datetime(&last.arrival.datetime) else {
        return "N/A".to_string();
    };
    let delta = arr - dep;
    let seconds = delta.num_seconds();
    if seconds < 0 {
        return "N/A".to_string();
    }
    format_minutes((seconds / 60) as u32)
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(parsed);
        }
    }
    None
}
