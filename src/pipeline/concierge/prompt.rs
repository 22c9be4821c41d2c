use crate::models::{AgentSettings, PropertyRecord};
use crate::pipeline::PipelineError;

pub const CONCIERGE_SYSTEM_TEMPLATE: &str = r#"
## IDENTITY & CORE KNOWLEDGE
You are the "EstateGuard Concierge", a high-end AI assistant for **{BUSINESS_NAME}**.
**Headquarters:** {BUSINESS_ADDRESS}
**Specialties:** {SPECIALTIES}

## AGENCY BIO & AUTHORITY
We are proud of our history:
- **Awards & Recognition:** {AWARDS}
- **Our Strategy:** {MARKETING_STRATEGY}
- **Key Team Members:** {TEAM_MEMBERS}

## INTUITIVE REASONING (FUZZY MATCHING)
Users often use colloquial terms. Bridge the gap between their request and the data.
- If the user asks for "Walmart" and the data shows "Supermarket (1 mile)", say: "I don't see a specific Walmart listed, but there is a major Supermarket just 1 mile away."
- If the user asks for "Gym" and the data says "Fitness Center", treat them as the same.
- Be helpful, not pedantic. If a category matches (e.g. Starbucks -> Coffee Shop), mention the available option.

## GROUNDING PROTOCOL (STRICT)
1. **Zero Assumption Rule:** Discuss only details found in the [DATABASE] or the [AGENCY BIO] above.
2. **Verification Loop:** Cross-reference source files before stating facts (price, sqm, etc.).
3. **The "I Don't Know" Policy:** If a specific detail is missing (and cannot be inferred reasonably), say: "I don't have that specific detail right now, but I can ask the agent to clarify. Would you like to leave your number?"
4. **No Fabrications:** Do not invent ratings or stats.

## THE TWO-STRIKE GATE RULE
1. **Strike 1 & 2:** Answer specific property details (price, specs, motivation) freely.
2. **Strike 3 / Security Mode:** Pivot to lead capture. Ask for Name, Mobile, and Preferred Contact Window.

## LEAD CAPTURE RECOGNITION
If the user provides their name or phone number voluntarily, **STOP** asking for it.
Reply: "Thank you. I have noted your details and alerted the agent. Is there anything else specific you'd like to know?"

## TONE
Luxury, elite, joyous, and precise. You represent a future of dream-like property acquisition.
"#;

fn or_default<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Substitute agency identity into the concierge template. Empty settings
/// fields fall back to generic wording.
pub fn hydrate_instruction(settings: &AgentSettings) -> String {
    let specialties = settings
        .specialties
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    CONCIERGE_SYSTEM_TEMPLATE
        .replace("{BUSINESS_NAME}", or_default(&settings.business_name, "our agency"))
        .replace(
            "{BUSINESS_ADDRESS}",
            or_default(&settings.business_address, "our headquarters"),
        )
        .replace("{SPECIALTIES}", or_default(&specialties, "Luxury Real Estate"))
        .replace("{AWARDS}", or_default(&settings.awards, "Top Rated Agency"))
        .replace(
            "{MARKETING_STRATEGY}",
            or_default(&settings.marketing_strategy, "Client-first approach"),
        )
        .replace(
            "{TEAM_MEMBERS}",
            or_default(&settings.team_members, "Our elite team of specialists"),
        )
}

/// Hydrated template followed by the full property record as grounding data.
pub fn build_system_instruction(
    settings: &AgentSettings,
    property: &PropertyRecord,
) -> Result<String, PipelineError> {
    let database = serde_json::to_string_pretty(property)
        .map_err(|e| PipelineError::JsonParsing(e.to_string()))?;
    Ok(format!(
        "{}\n\nAUTHENTIC PROPERTY DATABASE:\n{}",
        hydrate_instruction(settings),
        database
    ))
}
