// Baggage allowance and fare-penalty resolution.
//
// Baggage can come from a price-class description block or from per-segment
// bag-detail references; penalties are shared objects referenced from each
// fare component. Both are resolved here into display-ready values plus the
// structured FareRules record the UI consumes.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::document::{get_path, list_at, str_at, unwrap_number, unwrap_value};
use crate::reference_index::ReferenceIndex;

/// Fixed mapping from penalty application-timing codes to display text.
/// Unmapped codes render as "Code {n}".
const APPLICATION_CODES: [(&str, &str); 4] = [
    ("1", "After Departure NO Show"),
    ("2", "Prior to Departure"),
    ("3", "After Departure"),
    ("4", "Before Departure No Show"),
];

pub fn application_description(code: &str) -> String {
    APPLICATION_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, desc)| desc.to_string())
        .unwrap_or_else(|| format!("Code {code}"))
}

/// One penalty entry per resolved detail-amount combination.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalty {
    #[serde(rename = "type")]
    pub penalty_type: String,
    pub application: String,
    pub amount: f64,
    pub currency: String,
    pub remarks: Vec<String>,
    pub refundable: bool,
    pub cancel_fee: bool,
}

/// Single-offer-path baggage fields, with an explicit sentinel instead of
/// omitted keys.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaggageInfo {
    pub carry_on: String,
    pub checked: String,
}

pub const NOT_SPECIFIED: &str = "Not specified";

impl Default for BaggageInfo {
    fn default() -> Self {
        Self {
            carry_on: NOT_SPECIFIED.to_string(),
            checked: NOT_SPECIFIED.to_string(),
        }
    }
}

/// Multi-passenger-type-path baggage fields; `None` is serialized as null.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BaggageAllowance {
    pub carry_on_allowance: Option<String>,
    pub checked_allowance: Option<String>,
}

/// Resolves baggage for one association: price-class description texts with
/// carry-on/checked markers first, per-segment bag-detail references second.
pub fn resolve_baggage(assoc: &Value, index: &ReferenceIndex) -> BaggageAllowance {
    if let Some(reference) = str_at(assoc, &["PriceClass", "PriceClassReference"]) {
        if let Some(price_class) = index.price_classes.get(reference) {
            let texts: Vec<&str> = list_at(price_class, &["Descriptions", "Description"])
                .into_iter()
                .filter_map(|d| str_at(d, &["Text", "value"]))
                .collect();
            let carry = texts.iter().find(|t| t.contains("CARRYON")).map(|t| t.to_string());
            let checked = texts.iter().find(|t| t.contains("CHECKED")).map(|t| t.to_string());
            if carry.is_some() || checked.is_some() {
                return BaggageAllowance {
                    carry_on_allowance: carry,
                    checked_allowance: checked,
                };
            }
        }
    }

    let mut carry_descs = Vec::new();
    let mut checked_descs = Vec::new();
    for segment_ref in list_at(assoc, &["ApplicableFlight", "FlightSegmentReference"]) {
        let bag_detail = get_path(segment_ref, &["BagDetailAssociation"]).unwrap_or(&Value::Null);
        collect_allowance_texts(
            bag_detail,
            "CarryOnReferences",
            &index.carry_on_allowances,
            &mut carry_descs,
        );
        collect_allowance_texts(
            bag_detail,
            "CheckedBagReferences",
            &index.checked_bag_allowances,
            &mut checked_descs,
        );
    }

    BaggageAllowance {
        carry_on_allowance: carry_descs.into_iter().next(),
        checked_allowance: checked_descs.into_iter().next(),
    }
}

fn collect_allowance_texts(
    bag_detail: &Value,
    ref_field: &str,
    allowances: &std::collections::HashMap<String, Value>,
    out: &mut Vec<String>,
) {
    for reference in list_at(bag_detail, &[ref_field]) {
        let Some(key) = reference.as_str() else { continue };
        let Some(allowance) = allowances.get(key) else {
            warn!(key, ref_field, "bag allowance reference not found");
            continue;
        };
        for desc in list_at(allowance, &["AllowanceDescription", "Descriptions", "Description"]) {
            if let Some(text) = str_at(desc, &["Text", "value"]) {
                out.push(text.to_string());
            }
        }
    }
}

/// Single-offer-path baggage extraction over the offer-price associations,
/// keeping the first description found for each category.
pub fn extract_baggage_info(offer_price: &Value, index: &ReferenceIndex) -> BaggageInfo {
    let mut info = BaggageInfo::default();
    for assoc in list_at(offer_price, &["RequestedDate", "Associations"]) {
        let resolved = resolve_baggage(assoc, index);
        if info.carry_on == NOT_SPECIFIED {
            if let Some(carry) = resolved.carry_on_allowance {
                info.carry_on = carry;
            }
        }
        if info.checked == NOT_SPECIFIED {
            if let Some(checked) = resolved.checked_allowance {
                info.checked = checked;
            }
        }
        if info.carry_on != NOT_SPECIFIED && info.checked != NOT_SPECIFIED {
            break;
        }
    }
    info
}

/// Penalty reference keys for the first fare component of the first offer
/// price (the single-offer path's source).
pub fn first_component_penalty_refs(priced_offer: &Value) -> Vec<String> {
    let offer_prices = list_at(priced_offer, &["OfferPrice"]);
    let Some(offer_price) = offer_prices.first() else {
        return Vec::new();
    };
    let components = list_at(offer_price, &["FareDetail", "FareComponent"]);
    let Some(component) = components.first() else {
        return Vec::new();
    };
    penalty_refs_of_component(component)
}

/// Penalty reference keys across every fare component of one offer-price
/// block (the multi-passenger-type path's source).
pub fn all_component_penalty_refs(price_block: &Value) -> Vec<String> {
    list_at(price_block, &["FareDetail", "FareComponent"])
        .into_iter()
        .flat_map(|component| penalty_refs_of_component(component))
        .collect()
}

fn penalty_refs_of_component(component: &Value) -> Vec<String> {
    list_at(component, &["FareRules", "Penalty", "refs"])
        .into_iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

/// Resolves penalty references into flat entries, one per detail-amount
/// combination. A detail with no amount entries still yields one zero-amount
/// record so the detail is not lost.
pub fn penalties_from_refs(refs: &[String], index: &ReferenceIndex) -> Vec<Penalty> {
    let mut penalties = Vec::new();
    for reference in refs {
        let Some(entry) = index.penalties.get(reference) else {
            warn!(reference, "penalty reference not found in index");
            continue;
        };
        let refundable = get_path(entry, &["RefundableInd"])
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let cancel_fee = get_path(entry, &["CancelFeeInd"])
            .and_then(Value::as_bool)
            .unwrap_or(false);

        for detail in list_at(entry, &["Details", "Detail"]) {
            let penalty_type = str_at(detail, &["Type"]).unwrap_or("Unknown").to_string();
            let application = application_description(
                str_at(detail, &["Application", "Code"]).unwrap_or(""),
            );

            let amounts = list_at(detail, &["Amounts", "Amount"]);
            if amounts.is_empty() {
                penalties.push(Penalty {
                    penalty_type: penalty_type.clone(),
                    application: application.clone(),
                    amount: 0.0,
                    currency: "USD".to_string(),
                    remarks: Vec::new(),
                    refundable,
                    cancel_fee,
                });
                continue;
            }

            for amount in amounts {
                let value = get_path(amount, &["CurrencyAmountValue"])
                    .map(unwrap_number)
                    .unwrap_or(0.0);
                let currency = str_at(amount, &["CurrencyAmountValue", "Code"])
                    .unwrap_or("USD")
                    .to_string();
                let remarks = list_at(amount, &["ApplicableFeeRemarks", "Remark"])
                    .into_iter()
                    .filter_map(unwrap_value)
                    .map(str::to_string)
                    .collect();

                penalties.push(Penalty {
                    penalty_type: penalty_type.clone(),
                    application: application.clone(),
                    amount: value,
                    currency,
                    remarks,
                    refundable,
                    cancel_fee,
                });
            }
        }
    }
    penalties
}

/// Single-offer-path entry point: penalties referenced by the first fare
/// component of the priced offer.
pub fn extract_penalties(priced_offer: &Value, index: &ReferenceIndex) -> Vec<Penalty> {
    let refs = first_component_penalty_refs(priced_offer);
    penalties_from_refs(&refs, index)
}

/// Cancel/change fee bounds used by the multi-passenger-type path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PenaltySummary {
    pub cancel_fee_min: f64,
    pub cancel_fee_max: f64,
    pub change_fee_min: f64,
    pub change_fee_max: f64,
}

pub fn penalty_summary(refs: &[String], index: &ReferenceIndex) -> PenaltySummary {
    let mut cancel = Vec::new();
    let mut change = Vec::new();
    for penalty in penalties_from_refs(refs, index) {
        if penalty.penalty_type.contains("Cancel") {
            cancel.push(penalty.amount);
        }
        if penalty.penalty_type.contains("Change") {
            change.push(penalty.amount);
        }
    }
    PenaltySummary {
        cancel_fee_min: min_of(&cancel),
        cancel_fee_max: max_of(&cancel),
        change_fee_min: min_of(&change),
        change_fee_max: max_of(&change),
    }
}

fn min_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

fn max_of(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Timing-keyed fare-rule sub-record; `refund_percentage` only applies to
/// cancel variants.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareRuleDetail {
    pub allowed: bool,
    pub fee: f64,
    pub currency: String,
    pub conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_percentage: Option<f64>,
}

/// Structured fare rules derived from the flat penalty list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareRules {
    pub change_fee: bool,
    pub refundable: bool,
    pub exchangeable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_before_departure: Option<FareRuleDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_after_departure: Option<FareRuleDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_no_show: Option<FareRuleDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_before_departure: Option<FareRuleDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_after_departure: Option<FareRuleDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_no_show: Option<FareRuleDetail>,
    pub penalties: Vec<String>,
    pub additional_restrictions: Vec<String>,
}

pub fn fare_rules_from_penalties(penalties: &[Penalty]) -> FareRules {
    let mut rules = FareRules::default();

    for penalty in penalties {
        let type_lower = penalty.penalty_type.to_lowercase();
        let application_lower = penalty.application.to_lowercase();
        let conditions = if penalty.remarks.is_empty() {
            None
        } else {
            Some(penalty.remarks.join(", "))
        };

        if type_lower == "change" {
            rules.exchangeable = true;
            if penalty.amount > 0.0 {
                rules.change_fee = true;
            }
            let detail = FareRuleDetail {
                allowed: true,
                fee: penalty.amount,
                currency: penalty.currency.clone(),
                conditions: conditions.clone(),
                refund_percentage: None,
            };
            // "after departure no show" deliberately lands in the
            // after-departure bucket; match order mirrors that.
            if application_lower.contains("prior to departure") {
                rules.change_before_departure = Some(detail);
            } else if application_lower.contains("after departure") {
                rules.change_after_departure = Some(detail);
            } else if application_lower.contains("no show") {
                rules.change_no_show = Some(detail);
            }
        } else if type_lower == "cancel" {
            rules.refundable = penalty.refundable;
            let refund_percentage = if penalty.refundable && penalty.amount == 0.0 {
                100.0
            } else if penalty.amount > 0.0 {
                100.0 - penalty.amount / 100.0
            } else {
                0.0
            };
            let detail = FareRuleDetail {
                allowed: true,
                fee: penalty.amount,
                currency: penalty.currency.clone(),
                conditions: conditions.clone(),
                refund_percentage: Some(refund_percentage),
            };
            if application_lower.contains("prior to departure") {
                rules.cancel_before_departure = Some(detail);
            } else if application_lower.contains("after departure") {
                rules.cancel_after_departure = Some(detail);
            } else if application_lower.contains("no show") {
                rules.cancel_no_show = Some(detail);
            }
        }

        rules.penalties.push(format!(
            "{} - {}: {} {}",
            title_case(&type_lower),
            penalty.application,
            crate::document::format_amount(penalty.amount),
            penalty.currency
        ));

        for remark in &penalty.remarks {
            if !rules.additional_restrictions.contains(remark) {
                rules.additional_restrictions.push(remark.clone());
            }
        }
    }

    rules
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
