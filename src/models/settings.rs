use serde::{Deserialize, Serialize};

/// Agency identity, branding and knowledge-base text.
///
/// The knowledge-base fields are passed verbatim into the concierge system
/// prompt. `high_security_mode` gates visibility-protocol enforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSettings {
    pub business_name: String,
    pub primary_color: String,
    #[serde(default)]
    pub api_key: String,
    pub high_security_mode: bool,
    #[serde(default)]
    pub subscription_tier: String,
    #[serde(default)]
    pub monthly_price: f64,
    #[serde(default)]
    pub business_address: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub agent_count: u32,
    #[serde(default)]
    pub concierge_intro: String,
    #[serde(default)]
    pub terms_and_conditions: String,
    #[serde(default)]
    pub privacy_policy: String,
    #[serde(default)]
    pub nda: String,
    #[serde(default)]
    pub location_hours: String,
    #[serde(default)]
    pub service_areas: String,
    #[serde(default)]
    pub commission_rates: String,
    #[serde(default)]
    pub marketing_strategy: String,
    #[serde(default)]
    pub team_members: String,
    #[serde(default)]
    pub awards: String,
    #[serde(default)]
    pub legal_disclaimer: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            business_name: "EstateGuard AI".into(),
            primary_color: "#d4af37".into(),
            api_key: String::new(),
            high_security_mode: true,
            subscription_tier: "Enterprise".into(),
            monthly_price: 0.0,
            business_address: "77 Ocean Drive, Miami FL".into(),
            contact_email: "hq@estateguard.ai".into(),
            contact_phone: "+1 (800) ESTATE-AI".into(),
            specialties: vec![
                "Luxury Waterfront".into(),
                "Commercial High-Rise".into(),
                "Exclusive Land".into(),
            ],
            agent_count: 12,
            concierge_intro: "Ask our happy assistant about any of our properties 24/7".into(),
            terms_and_conditions: String::new(),
            privacy_policy: String::new(),
            nda: String::new(),
            location_hours: String::new(),
            service_areas: String::new(),
            commission_rates: String::new(),
            marketing_strategy: String::new(),
            team_members: String::new(),
            awards: String::new(),
            legal_disclaimer: String::new(),
        }
    }
}

impl AgentSettings {
    /// The explicitly configured provider key, if any.
    pub fn api_key(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}
