use std::sync::LazyLock;

use regex::Regex;

use super::PipelineError;

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```json(.*?)```").unwrap());
static ANY_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").unwrap());

/// Pull the single JSON object out of free-form model output.
///
/// Candidate text: a ```json fenced block if present, else any fenced block,
/// else the whole reply. Within it, everything from the first `{` to the last
/// `}` must parse as JSON.
pub fn extract_json(text: &str) -> Result<serde_json::Value, PipelineError> {
    let candidate = JSON_FENCE
        .captures(text)
        .or_else(|| ANY_FENCE.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(text)
        .trim();

    let (first, last) = match (candidate.find('{'), candidate.rfind('}')) {
        (Some(first), Some(last)) if first < last => (first, last),
        _ => return Err(PipelineError::MalformedResponse("No JSON found".into())),
    };

    serde_json::from_str(&candidate[first..=last])
        .map_err(|e| PipelineError::JsonParsing(e.to_string()))
}
