//! Enforcement of a listing's visibility protocol.
//!
//! With high-security mode on, gated field names are stripped from the public
//! projection of a listing. With it off, gated fields are advisory only and
//! the projection is the full record.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::models::{AgentSettings, PropertyRecord, VisibilityProtocol};

/// Keys never stripped: identity and the protocol itself.
const PROTECTED_KEYS: [&str; 2] = ["property_id", "visibility_protocol"];

/// Names listed as both public and gated.
pub fn overlapping_fields(protocol: &VisibilityProtocol) -> BTreeSet<String> {
    protocol
        .public_fields
        .intersection(&protocol.gated_fields)
        .cloned()
        .collect()
}

fn strip(value: &mut Value, gated: &BTreeSet<String>) -> usize {
    match value {
        Value::Object(map) => strip_map(map, gated),
        Value::Array(items) => items.iter_mut().map(|v| strip(v, gated)).sum(),
        _ => 0,
    }
}

fn strip_map(map: &mut Map<String, Value>, gated: &BTreeSet<String>) -> usize {
    let before = map.len();
    map.retain(|key, _| !gated.contains(key));
    let mut removed = before - map.len();
    for child in map.values_mut() {
        removed += strip(child, gated);
    }
    removed
}

/// The listing as a prospect may see it.
pub fn public_view(property: &PropertyRecord, settings: &AgentSettings) -> Value {
    let mut view = match serde_json::to_value(property) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(property_id = %property.property_id, error = %e, "Listing not serializable");
            return Value::Null;
        }
    };
    if !settings.high_security_mode {
        return view;
    }

    let overlap = overlapping_fields(&property.visibility_protocol);
    if !overlap.is_empty() {
        tracing::warn!(
            property_id = %property.property_id,
            fields = ?overlap,
            "Fields listed as both public and gated; treating as gated"
        );
    }

    let gated = &property.visibility_protocol.gated_fields;
    let mut removed = 0;
    if let Value::Object(root) = &mut view {
        for (key, child) in root.iter_mut() {
            if PROTECTED_KEYS.contains(&key.as_str()) {
                continue;
            }
            removed += strip(child, gated);
        }
        let before = root.len();
        root.retain(|key, _| PROTECTED_KEYS.contains(&key.as_str()) || !gated.contains(key));
        removed += before - root.len();
    }

    tracing::debug!(property_id = %property.property_id, removed, "Public view built");
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seed_portfolio;
    use serde_json::json;

    fn gated_listing(gated: &[&str]) -> PropertyRecord {
        let mut p = seed_portfolio().remove(0);
        p.visibility_protocol = VisibilityProtocol::new(&["address", "hero_narrative", "price"], gated);
        p.deep_data.insert("private_appraisal".into(), json!(17_900_000));
        p.deep_data.insert("schools".into(), json!([{"name": "Aspen High", "seller_concessions": "none"}]));
        p
    }

    fn secure() -> AgentSettings {
        AgentSettings::default()
    }

    #[test]
    fn security_mode_strips_gated_fields_at_any_depth() {
        let p = gated_listing(&["private_appraisal", "seller_concessions", "motivation", "lot_size"]);
        let view = public_view(&p, &secure());

        assert!(view["deep_data"].get("private_appraisal").is_none());
        assert!(view["deep_data"]["schools"][0].get("seller_concessions").is_none());
        assert_eq!(view["deep_data"]["schools"][0]["name"], "Aspen High");
        assert!(view["agent_notes"].get("motivation").is_none());
        assert!(view["listing_details"]["key_stats"].get("lot_size").is_none());
        assert_eq!(view["listing_details"]["address"], "The Glass House, Aspen Peaks");
        // the protocol itself still lists the gated names
        assert_eq!(view["visibility_protocol"]["gated_fields"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn overlap_is_reported_and_treated_as_gated() {
        let p = gated_listing(&["price"]);
        assert_eq!(
            overlapping_fields(&p.visibility_protocol),
            BTreeSet::from(["price".to_string()])
        );

        let view = public_view(&p, &secure());
        assert!(view["listing_details"].get("price").is_none());
    }

    #[test]
    fn advisory_when_security_mode_off() {
        let p = gated_listing(&["private_appraisal", "motivation"]);
        let settings = AgentSettings {
            high_security_mode: false,
            ..AgentSettings::default()
        };
        let view = public_view(&p, &settings);
        assert_eq!(view, serde_json::to_value(&p).unwrap());
    }

    #[test]
    fn identity_is_never_stripped() {
        let p = gated_listing(&["property_id", "tier"]);
        let view = public_view(&p, &secure());
        assert_eq!(view["property_id"], "EG-770");
        assert!(view.get("tier").is_none());
    }
}
