use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::enums::{PropertyCategory, PropertyStatus, PropertyTier, TransactionType};

/// A listing in the agency portfolio. `property_id` is unique per portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property_id: String,
    pub category: PropertyCategory,
    pub transaction_type: TransactionType,
    pub status: PropertyStatus,
    pub tier: PropertyTier,
    pub visibility_protocol: VisibilityProtocol,
    pub listing_details: ListingDetails,
    #[serde(default)]
    pub deep_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub agent_notes: AgentNotes,
}

/// Which field names are public and which are withheld until qualification.
/// Disjointness is not enforced here; see `visibility::overlapping_fields`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityProtocol {
    #[serde(default)]
    pub public_fields: BTreeSet<String>,
    #[serde(default)]
    pub gated_fields: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub address: String,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_tour_url: Option<String>,
    #[serde(default)]
    pub hero_narrative: String,
    #[serde(default)]
    pub key_stats: KeyStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sq_ft: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoning: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentNotes {
    #[serde(default)]
    pub motivation: String,
    #[serde(default)]
    pub showing_instructions: String,
}

fn field_set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl VisibilityProtocol {
    pub fn new(public: &[&str], gated: &[&str]) -> Self {
        Self {
            public_fields: field_set(public),
            gated_fields: field_set(gated),
        }
    }
}

/// Demonstration listings shown before the backend has any rows.
pub const PROPERTY_ID_PREFIX: &str = "EG-";

/// Generated ids are drawn from `EG-0..EG-999` while any is free.
const PROPERTY_ID_SPACE: u32 = 1000;
const WIDE_PROPERTY_ID_SPACE: u32 = 1_000_000;

/// Canonical `EG-<digits>` form of `raw`, or `None` for anything else
/// (placeholders like `EG-<number>` included).
pub fn parse_property_id(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let prefix = raw.get(..PROPERTY_ID_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(PROPERTY_ID_PREFIX) {
        return None;
    }
    let digits = &raw[PROPERTY_ID_PREFIX.len()..];
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{PROPERTY_ID_PREFIX}{digits}"))
}

/// A fresh id not present in `taken`.
pub fn generate_property_id(taken: &BTreeSet<String>) -> String {
    let mut rng = rand::thread_rng();
    let free: Vec<u32> = (0..PROPERTY_ID_SPACE)
        .filter(|n| !taken.contains(&format!("{PROPERTY_ID_PREFIX}{n}")))
        .collect();
    if let Some(n) = free.choose(&mut rng) {
        return format!("{PROPERTY_ID_PREFIX}{n}");
    }

    tracing::warn!(taken = taken.len(), "Short property id space exhausted, widening");
    loop {
        let id = format!(
            "{PROPERTY_ID_PREFIX}{}",
            rng.gen_range(PROPERTY_ID_SPACE..WIDE_PROPERTY_ID_SPACE)
        );
        if !taken.contains(&id) {
            return id;
        }
    }
}

pub fn seed_portfolio() -> Vec<PropertyRecord> {
    vec![
        PropertyRecord {
            property_id: "EG-770".into(),
            category: PropertyCategory::Residential,
            transaction_type: TransactionType::Sale,
            status: PropertyStatus::Active,
            tier: PropertyTier::EliteGated,
            visibility_protocol: VisibilityProtocol::new(
                &["address", "hero_narrative", "key_stats"],
                &["private_appraisal", "seller_concessions"],
            ),
            listing_details: ListingDetails {
                address: "The Glass House, Aspen Peaks".into(),
                price: 18_500_000.0,
                image_url: None,
                video_tour_url: Some("https://www.w3schools.com/html/mov_bbb.mp4".into()),
                hero_narrative: "A seamless fusion of glass and stone, this peak-side masterpiece offers unparalleled alpine luxury.".into(),
                key_stats: KeyStats {
                    bedrooms: Some(7.0),
                    bathrooms: Some(9.0),
                    sq_ft: Some(18_200.0),
                    lot_size: Some("12 Acres".into()),
                    zoning: None,
                },
            },
            deep_data: serde_json::Map::new(),
            agent_notes: AgentNotes {
                motivation: "Private".into(),
                showing_instructions: "Proof of Funds required".into(),
            },
        },
        PropertyRecord {
            property_id: "EG-212".into(),
            category: PropertyCategory::Commercial,
            transaction_type: TransactionType::Lease,
            status: PropertyStatus::Active,
            tier: PropertyTier::Standard,
            visibility_protocol: VisibilityProtocol::new(&["address"], &["mechanical_specs"]),
            listing_details: ListingDetails {
                address: "Tech Plaza Tower, Austin TX".into(),
                price: 4_200_000.0,
                image_url: None,
                video_tour_url: None,
                hero_narrative: "Premium class-A office space with LEED Platinum certification.".into(),
                key_stats: KeyStats {
                    bedrooms: None,
                    bathrooms: None,
                    sq_ft: Some(120_000.0),
                    lot_size: Some("2.5 Acres".into()),
                    zoning: Some("Commercial-A".into()),
                },
            },
            deep_data: serde_json::Map::new(),
            agent_notes: AgentNotes {
                motivation: "Downsizing portfolio".into(),
                showing_instructions: "Appt only".into(),
            },
        },
    ]
}
