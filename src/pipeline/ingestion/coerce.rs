//! Boundary coercion of model output into a typed `PropertyRecord`.
//!
//! Models return numbers as strings ("$1,250,000", "1,800 sq ft"), enum labels
//! in arbitrary case and sections in slightly different places. Everything is
//! normalised here so the rest of the crate only sees fully-typed records.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::models::{
    parse_property_id, AgentNotes, KeyStats, ListingDetails, PropertyCategory, PropertyRecord, PropertyStatus,
    PropertyTier, TransactionType, VisibilityProtocol,
};
use crate::pipeline::PipelineError;

/// Listings above this price are gated when the model gives no tier.
pub const ELITE_PRICE_THRESHOLD: f64 = 5_000_000.0;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").unwrap());
static PRICE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*(million|thousand|mm|m|k)?\b").unwrap()
});

/// A coerced record plus what the model actually stated.
#[derive(Debug, Clone)]
pub struct CoercedListing {
    pub record: PropertyRecord,
    pub tier_given: bool,
    pub id_given: bool,
}

fn non_negative(n: f64) -> Option<f64> {
    (n.is_finite() && n >= 0.0).then_some(n)
}

/// Lenient number: JSON numbers as-is, strings by their first numeric token.
/// Units are ignored ("465 m²" is 465). Negative and non-finite values are
/// treated as absent.
pub fn lenient_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => NUMBER.find(s)?.as_str().replace(',', "").parse().ok()?,
        _ => return None,
    };
    non_negative(n)
}

/// Like `lenient_number`, but "1.2M", "850k" and "2 million" are scaled.
pub fn lenient_price(value: &Value) -> Option<f64> {
    let Value::String(s) = value else {
        return lenient_number(value);
    };
    let caps = PRICE_AMOUNT.captures(s)?;
    let base: f64 = caps.get(1)?.as_str().replace(',', "").parse().ok()?;
    let scale = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(u) if u == "million" || u == "m" || u == "mm" => 1_000_000.0,
        Some(u) if u == "thousand" || u == "k" => 1_000.0,
        _ => 1.0,
    };
    non_negative(base * scale)
}

/// Like `lenient_number` but zero means unknown.
fn stat(value: Option<&Value>) -> Option<f64> {
    value.and_then(lenient_number).filter(|n| *n > 0.0)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() && !s.eq_ignore_ascii_case("null") => {
            Some(s.trim().to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn http_url(value: Option<&Value>) -> Option<String> {
    text(value).filter(|s| s.starts_with("http://") || s.starts_with("https://"))
}

fn string_set(value: Option<&Value>) -> Option<BTreeSet<String>> {
    let items = value?.as_array()?;
    Some(
        items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}

fn transaction_type(value: Option<&Value>) -> TransactionType {
    let Some(raw) = value.and_then(Value::as_str) else {
        return TransactionType::default();
    };
    if let Some(t) = TransactionType::parse_loose(raw) {
        return t;
    }
    let lower = raw.to_ascii_lowercase();
    if lower.contains("lease") {
        TransactionType::Lease
    } else if lower.contains("rent") || lower.contains("/mo") || lower.contains("month") {
        TransactionType::Rent
    } else {
        TransactionType::Sale
    }
}

fn tier(value: Option<&Value>) -> Option<PropertyTier> {
    let raw = value?.as_str()?;
    PropertyTier::parse_loose(raw).or_else(|| {
        let lower = raw.to_ascii_lowercase();
        if lower.contains("elite") || lower.contains("gated") || lower.contains("guard") {
            Some(PropertyTier::EliteGated)
        } else if lower.contains("standard") {
            Some(PropertyTier::Standard)
        } else {
            None
        }
    })
}

/// Tier derived from price alone.
pub fn tier_for_price(price: f64) -> PropertyTier {
    if price > ELITE_PRICE_THRESHOLD {
        PropertyTier::EliteGated
    } else {
        PropertyTier::Standard
    }
}

/// Coerce a parsed model reply into a `PropertyRecord`.
///
/// Fails when the reply is not a JSON object, or when it carries none of
/// address, narrative and price. Other missing or unreadable fields fall back
/// to their defaults; the tier is price-derived when absent.
pub fn coerce_record(value: &Value) -> Result<CoercedListing, PipelineError> {
    let root = value.as_object().ok_or_else(|| {
        PipelineError::MalformedResponse("Expected a JSON object for the listing".into())
    })?;

    let empty = Map::new();
    // Some replies flatten listing_details / key_stats into the root.
    let details = root
        .get("listing_details")
        .and_then(Value::as_object)
        .unwrap_or(root);
    let stats = details
        .get("key_stats")
        .and_then(Value::as_object)
        .unwrap_or(details);
    let visibility = root
        .get("visibility_protocol")
        .and_then(Value::as_object)
        .unwrap_or(&empty);
    let notes = root
        .get("agent_notes")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let price = details.get("price").and_then(lenient_price).unwrap_or(0.0);
    let address = text(details.get("address"));
    let hero_narrative = text(details.get("hero_narrative"));
    if address.is_none() && hero_narrative.is_none() && price <= 0.0 {
        return Err(PipelineError::MalformedResponse(
            "Reply has no address, narrative or price".into(),
        ));
    }

    let given_tier = tier(root.get("tier"));
    let property_id = text(root.get("property_id")).and_then(|raw| {
        let parsed = parse_property_id(&raw);
        if parsed.is_none() {
            tracing::debug!(raw = %raw, "Ignoring non-numeric property id");
        }
        parsed
    });

    let record = PropertyRecord {
        property_id: property_id.clone().unwrap_or_default(),
        category: root
            .get("category")
            .and_then(Value::as_str)
            .and_then(PropertyCategory::parse_loose)
            .unwrap_or_default(),
        transaction_type: transaction_type(root.get("transaction_type")),
        status: root
            .get("status")
            .and_then(Value::as_str)
            .and_then(PropertyStatus::parse_loose)
            .unwrap_or_default(),
        tier: given_tier.unwrap_or_else(|| tier_for_price(price)),
        visibility_protocol: VisibilityProtocol {
            public_fields: string_set(visibility.get("public_fields")).unwrap_or_else(|| {
                ["address", "hero_narrative"].iter().map(|s| s.to_string()).collect()
            }),
            gated_fields: string_set(visibility.get("gated_fields")).unwrap_or_default(),
        },
        listing_details: ListingDetails {
            address: address.unwrap_or_default(),
            price,
            image_url: http_url(details.get("image_url")),
            video_tour_url: http_url(details.get("video_tour_url")),
            hero_narrative: hero_narrative.unwrap_or_default(),
            key_stats: KeyStats {
                bedrooms: stat(stats.get("bedrooms")),
                bathrooms: stat(stats.get("bathrooms")),
                sq_ft: stat(stats.get("sq_ft")),
                lot_size: text(stats.get("lot_size")),
                zoning: text(stats.get("zoning")),
            },
        },
        deep_data: root
            .get("deep_data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        agent_notes: AgentNotes {
            motivation: text(notes.get("motivation")).unwrap_or_default(),
            showing_instructions: text(notes.get("showing_instructions")).unwrap_or_default(),
        },
    };

    Ok(CoercedListing {
        record,
        tier_given: given_tier.is_some(),
        id_given: property_id.is_some(),
    })
}
