/// Maximum characters of the source text placed in the prompt.
pub const MAX_PROMPT_INPUT_CHARS: usize = 200_000;

/// Narrative used when only the URL could be analysed.
pub const URL_ONLY_NARRATIVE: &str =
    "Linked Property (Data Pending). Please paste the full description text.";

pub const SCRAPER_SYSTEM_INSTRUCTION: &str = r#"
## IDENTITY
You are a precision Data Extraction Engine for Elite Real Estate.

GROUNDING PROTOCOL (STRICT):
- Zero Assumption Rule: only use properties and details found in the provided SOURCE TEXT.
- Verification Loop: before mapping a field (price, sqm, features), cross-reference the source text.
- The "I Don't Know" Policy: if a detail is missing, set the field to 0 or null. Do not guess.
- No Fabrications: do not invent school ratings, crime stats, or neighborhood vibes unless they are written in the source.

## TIERING LOGIC
- Set "tier" to "Estate Guard" ONLY if price > 5,000,000.
- Otherwise, set "tier" to "Standard".
"#;

/// Note placed in the prompt describing where the input came from.
pub fn scraped_note(url: &str) -> String {
    format!("(Analysis based on content scraped from URL: {url})")
}

pub const SCRAPE_FAILED_NOTE: &str =
    "(Note: Live scrape failed. Data inferred from URL structure only.)";

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the extraction prompt for one listing.
pub fn build_extraction_prompt(input_text: &str, processing_note: &str) -> String {
    let input_text = truncate_chars(input_text, MAX_PROMPT_INPUT_CHARS);

    format!(
        r#"Extract property data from the following text into a structured JSON object.

Input Context: {processing_note}
Input Text: "{input_text}"

IMPORTANT RULES:
1. If the input is full scraped website text, read it and extract the real details (price, beds, narrative).
2. LOOK HARDER FOR SPECS:
   - Search for "Bed", "Bd", "Bedroom", "Bath", "Ba", "Sq Ft", "Square Feet".
   - Search for price symbols like "$" followed by numbers.
   - "3 Bed" or "3bd" means bedrooms = 3. "2.5 Bath" or "2ba" means bathrooms = 2.5.
   - If the price appears in the text (e.g. "$1,250,000"), use it as a plain number.
   - TRANSACTION TYPE: "Rent", "Per Month", "/mo" means "Rent"; "Lease" means "Lease"; otherwise "Sale".
3. If the input was JUST a URL and scraping failed:
   - Try to extract the address from the URL slug.
   - Set "hero_narrative" to: "{URL_ONLY_NARRATIVE}"
   - Set "price", "bedrooms", "bathrooms", "sq_ft" to 0 or null.
4. DO NOT HALLUCINATE. Any field not evidenced in the text must be 0 or null.
5. IMAGES: if the text contains <img> tags, og:image meta tags or image URLs, put the main listing image URL in "image_url".

Return a JSON object strictly following this schema:
{{
  "property_id": "EG-<number>",
  "category": "Residential" | "Commercial" | "Land",
  "transaction_type": "Sale" | "Rent" | "Lease",
  "status": "Active",
  "tier": "Standard" | "Estate Guard",
  "listing_details": {{
    "address": "Full address string",
    "price": number (no symbols, 0 if unknown),
    "image_url": "URL of the main property image, or null",
    "hero_narrative": "Marketing description",
    "key_stats": {{
      "bedrooms": number or null,
      "bathrooms": number or null,
      "sq_ft": number or null,
      "lot_size": "string (e.g. 0.5 acres) or null"
    }}
  }},
  "visibility_protocol": {{
    "public_fields": ["address", "hero_narrative"],
    "gated_fields": ["private_appraisal", "seller_concessions"]
  }},
  "agent_notes": {{
    "motivation": "string",
    "showing_instructions": "string"
  }}
}}

Return ONLY the JSON."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_input_note_and_schema() {
        let prompt = build_extraction_prompt("3 Bed / 2 Bath", SCRAPE_FAILED_NOTE);
        assert!(prompt.contains("Input Text: \"3 Bed / 2 Bath\""));
        assert!(prompt.contains(SCRAPE_FAILED_NOTE));
        assert!(prompt.contains("\"visibility_protocol\""));
        assert!(prompt.contains(URL_ONLY_NARRATIVE));
        assert!(prompt.contains("DO NOT HALLUCINATE"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn huge_input_is_truncated() {
        let input = "x".repeat(MAX_PROMPT_INPUT_CHARS + 500);
        let prompt = build_extraction_prompt(&input, "");
        assert!(prompt.len() < MAX_PROMPT_INPUT_CHARS + 4_000);
    }

    #[test]
    fn scraped_note_names_the_url() {
        assert!(scraped_note("https://example.com/a").contains("https://example.com/a"));
    }
}
