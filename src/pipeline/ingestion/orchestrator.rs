use std::collections::BTreeSet;

use super::coerce::{coerce_record, tier_for_price};
use super::evidence::Evidence;
use super::fetch::{is_url, PageFetcher};
use super::prompt::{
    build_extraction_prompt, scraped_note, truncate_chars, SCRAPER_SYSTEM_INSTRUCTION,
    SCRAPE_FAILED_NOTE, URL_ONLY_NARRATIVE,
};
use crate::config::ModelCandidate;
use crate::models::{generate_property_id, PropertyRecord};
use crate::pipeline::fallback::FallbackRunner;
use crate::pipeline::normalize::extract_json;
use crate::pipeline::provider::{GenerateRequest, LlmClient};
use crate::pipeline::PipelineError;

/// Maximum characters of scraped page text kept.
pub const MAX_SCRAPED_CHARS: usize = 100_000;

/// Where the text the model analysed came from.
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    PastedText,
    ScrapedUrl { url: String },
    /// Scrape failed; only the URL itself was analysed.
    UrlOnly { url: String },
}

#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub record: PropertyRecord,
    pub source: InputSource,
    pub model: String,
    /// Set when the record was inferred from the URL alone.
    pub low_confidence: bool,
    /// Fields filled from literal specs in the source text.
    pub backfilled: Vec<&'static str>,
}

/// Turns a pasted listing or a listing URL into a `PropertyRecord`.
pub struct PropertyExtractor<'a> {
    llm: &'a dyn LlmClient,
    fetcher: &'a dyn PageFetcher,
    candidates: &'a [ModelCandidate],
    taken_ids: BTreeSet<String>,
}

impl<'a> PropertyExtractor<'a> {
    pub fn new(
        llm: &'a dyn LlmClient,
        fetcher: &'a dyn PageFetcher,
        candidates: &'a [ModelCandidate],
    ) -> Self {
        Self {
            llm,
            fetcher,
            candidates,
            taken_ids: BTreeSet::new(),
        }
    }

    /// Ids already in the portfolio. A new record never reuses one.
    pub fn with_taken_ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.taken_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve the text to analyse and the context note for the prompt.
    fn resolve_input(&self, input: &str) -> (String, String, InputSource) {
        if !is_url(input) {
            return (input.to_string(), String::new(), InputSource::PastedText);
        }

        let url = input.to_string();
        match self.fetcher.fetch_page(&url) {
            Ok(page) => {
                tracing::info!(chars = page.len(), "Scraped listing page");
                let text = truncate_chars(&page, MAX_SCRAPED_CHARS).to_string();
                let note = scraped_note(&url);
                (text, note, InputSource::ScrapedUrl { url })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Live scrape failed, analysing URL only");
                (url.clone(), SCRAPE_FAILED_NOTE.to_string(), InputSource::UrlOnly { url })
            }
        }
    }

    /// Extract a property record from free text or a URL.
    pub fn parse_property_data(&self, input: &str) -> Result<ExtractionResult, PipelineError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PipelineError::EmptyInput);
        }

        let span = tracing::info_span!("extract_property", url_input = is_url(input));
        let _guard = span.enter();

        let (text, note, source) = self.resolve_input(input);
        let prompt = build_extraction_prompt(&text, &note);
        let request = GenerateRequest::prompt(&prompt).with_system(SCRAPER_SYSTEM_INSTRUCTION);

        let (coerced, model) = FallbackRunner::new(self.llm, self.candidates).run(|llm, model| {
            let reply = llm.generate(model, &request)?;
            let value = extract_json(&reply)?;
            Ok((coerce_record(&value)?, model.name.clone()))
        })?;

        let mut record = coerced.record;
        if !coerced.id_given || self.taken_ids.contains(&record.property_id) {
            record.property_id = generate_property_id(&self.taken_ids);
        }

        let mut backfilled = Vec::new();
        let low_confidence = matches!(source, InputSource::UrlOnly { .. });
        match source {
            InputSource::UrlOnly { .. } => apply_url_only_fallback(&mut record),
            // Page markup is too noisy to scan; only pasted text is.
            InputSource::PastedText => {
                backfilled = Evidence::scan(&text).backfill(&mut record);
                if !coerced.tier_given {
                    record.tier = tier_for_price(record.listing_details.price);
                }
            }
            InputSource::ScrapedUrl { .. } => {}
        }

        tracing::info!(
            property_id = %record.property_id,
            model = %model,
            low_confidence,
            backfilled = backfilled.len(),
            "Property extracted"
        );

        Ok(ExtractionResult {
            record,
            source,
            model,
            low_confidence,
            backfilled,
        })
    }
}

/// Nothing but the URL was seen, so specs cannot be trusted.
fn apply_url_only_fallback(record: &mut PropertyRecord) {
    let details = &mut record.listing_details;
    details.hero_narrative = URL_ONLY_NARRATIVE.to_string();
    details.price = 0.0;
    details.key_stats.bedrooms = None;
    details.key_stats.bathrooms = None;
    details.key_stats.sq_ft = None;
    record.tier = tier_for_price(0.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::known_models;
    use crate::models::{PropertyStatus, PropertyTier};
    use crate::pipeline::ingestion::fetch::{FetchError, HttpProxyFetcher};
    use crate::pipeline::provider::mock::{not_found, ScriptedLlmClient};
    use crate::pipeline::provider::Part;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;

    use crate::test_support::spawn_stub;

    struct StaticFetcher(Result<String, FetchError>);

    impl PageFetcher for StaticFetcher {
        fn fetch_page(&self, _url: &str) -> Result<String, FetchError> {
            self.0.clone()
        }
    }

    fn prompt_text(client: &ScriptedLlmClient) -> String {
        let request = client.last_request().expect("a request was sent");
        match &request.contents[0].parts[0] {
            Part::Text(t) => t.clone(),
            other => panic!("unexpected part {other:?}"),
        }
    }

    #[test]
    fn pasted_text_round_trips_numeric_specs() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying(
            "```json\n{\"category\":\"Residential\",\"transaction_type\":\"Sale\",\
             \"listing_details\":{\"address\":\"12 Elm St\",\"price\":\"$1,250,000\",\
             \"hero_narrative\":\"Bright craftsman.\",\
             \"key_stats\":{\"bedrooms\":3,\"bathrooms\":\"2.5\",\"sq_ft\":\"1,800 sq ft\"}}}\n```",
        );
        let fetcher = StaticFetcher(Err(FetchError::Status(500)));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let result = extractor
            .parse_property_data("3 Bed / 2.5 Bath, $1,250,000, 1800 sq ft")
            .unwrap();

        let stats = &result.record.listing_details.key_stats;
        assert_eq!(result.record.listing_details.price, 1_250_000.0);
        assert_eq!(stats.bedrooms, Some(3.0));
        assert_eq!(stats.bathrooms, Some(2.5));
        assert_eq!(stats.sq_ft, Some(1800.0));
        assert_eq!(result.source, InputSource::PastedText);
        assert_eq!(result.record.status, PropertyStatus::Active);
        assert_eq!(result.record.tier, PropertyTier::Standard);
        assert!(result.record.property_id.starts_with("EG-"));
        assert!(!result.low_confidence);
        assert!(result.backfilled.is_empty());
    }

    #[test]
    fn evidence_fills_what_the_model_zeroed() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying(
            r#"{"property_id":"EG-9","listing_details":{"address":"12 Elm St","price":0,"key_stats":{"bedrooms":null,"bathrooms":2.5}}}"#,
        );
        let fetcher = StaticFetcher(Ok(String::new()));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let result = extractor
            .parse_property_data("3 Bed / 2.5 Bath, asking $6,250,000, 1800 sq ft")
            .unwrap();

        assert_eq!(result.record.property_id, "EG-9");
        assert_eq!(result.backfilled, vec!["price", "bedrooms", "sq_ft"]);
        assert_eq!(result.record.listing_details.price, 6_250_000.0);
        // tier follows the backfilled price
        assert_eq!(result.record.tier, PropertyTier::EliteGated);
    }

    #[test]
    fn scraped_page_is_sent_to_the_model() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying(r#"{"listing_details":{"address":"4 Oak Ln","price":500000}}"#);
        let fetcher = StaticFetcher(Ok("<title>4 Oak Ln</title> 2 bd".into()));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let result = extractor.parse_property_data("https://example.com/oak").unwrap();

        assert_eq!(
            result.source,
            InputSource::ScrapedUrl {
                url: "https://example.com/oak".into()
            }
        );
        let prompt = prompt_text(&llm);
        assert!(prompt.contains("<title>4 Oak Ln</title>"));
        assert!(prompt.contains("content scraped from URL: https://example.com/oak"));
        // page markup is never scanned for specs
        assert_eq!(result.record.listing_details.key_stats.bedrooms, None);
        assert!(result.backfilled.is_empty());
    }

    #[test]
    fn fee_amounts_never_become_the_price() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying(
            r#"{"listing_details":{"address":"9 Bay Rd","price":0,"hero_narrative":"Bayfront condo.","key_stats":{"bedrooms":2}}}"#,
        );
        let fetcher = StaticFetcher(Ok(String::new()));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let result = extractor
            .parse_property_data("9 Bay Rd condo, 2 Bed. Price upon request. HOA dues $450/mo.")
            .unwrap();

        assert_eq!(result.record.listing_details.price, 0.0);
        assert!(!result.backfilled.contains(&"price"));
        assert_eq!(result.record.tier, PropertyTier::Standard);
    }

    #[test]
    fn new_ids_avoid_the_portfolio() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying(
            r#"{"property_id":"EG-212","listing_details":{"address":"9 Bay Rd","price":950000}}"#,
        );
        let fetcher = StaticFetcher(Ok(String::new()));
        let taken: Vec<String> = (0..1000).filter(|n| *n != 17).map(|n| format!("EG-{n}")).collect();
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates).with_taken_ids(taken);

        let result = extractor.parse_property_data("9 Bay Rd, $950,000").unwrap();
        assert_eq!(result.record.property_id, "EG-17");
    }

    #[test]
    fn failed_proxy_yields_pending_listing() {
        let router = Router::new().route(
            "/api/proxy",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "{\"error\":\"upstream\"}") }),
        );
        let addr = spawn_stub(router);
        let fetcher = HttpProxyFetcher::new(&format!("http://{addr}/api/proxy"), 5).unwrap();

        // The model ignores the rules and invents specs.
        let llm = ScriptedLlmClient::replying(
            r#"{"listing_details":{"address":"listing-123, example.com","price":2400000,
                "hero_narrative":"Stunning modern estate","key_stats":{"bedrooms":5,"bathrooms":4,"sq_ft":4200}}}"#,
        );
        let candidates = known_models();
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let result = extractor
            .parse_property_data("https://example.com/listing-123")
            .unwrap();

        let details = &result.record.listing_details;
        assert_eq!(
            details.hero_narrative,
            "Linked Property (Data Pending). Please paste the full description text."
        );
        assert_eq!(details.price, 0.0);
        assert_eq!(details.key_stats.bedrooms, None);
        assert_eq!(details.key_stats.bathrooms, None);
        assert_eq!(details.key_stats.sq_ft, None);
        assert!(result.low_confidence);
        assert!(prompt_text(&llm).contains("Live scrape failed"));
    }

    #[test]
    fn falls_back_across_models() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::new(vec![
            Err(not_found("gemini-2.0-flash")),
            Ok(r#"{"listing_details":{"address":"A","price":1}}"#.into()),
        ]);
        let fetcher = StaticFetcher(Ok(String::new()));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let result = extractor.parse_property_data("A house").unwrap();
        assert_eq!(result.model, "gemini-flash-latest");
    }

    #[test]
    fn unreadable_reply_is_an_error() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying("Sorry, I cannot help with that.");
        let fetcher = StaticFetcher(Ok(String::new()));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        let err = extractor.parse_property_data("A house").unwrap_err();
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
        assert!(err.user_message().starts_with("Sync failed"));
    }

    #[test]
    fn blank_input_is_rejected_without_calls() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying("{}");
        let fetcher = StaticFetcher(Ok(String::new()));
        let extractor = PropertyExtractor::new(&llm, &fetcher, &candidates);

        assert_eq!(
            extractor.parse_property_data("   ").unwrap_err(),
            PipelineError::EmptyInput
        );
        assert!(llm.invoked_models().is_empty());
    }
}
