use std::time::Duration;

use super::gemini_types::{
    WireErrorEnvelope, WireGenerateRequest, WireGenerateResponse, WireModelList,
};
use super::types::{GenerateRequest, LlmClient};
use super::ProviderError;
use crate::config::{self, ModelCandidate, ProviderConfig};

/// Version used for the model-listing endpoint.
const LIST_API_VERSION: &str = "v1beta";

/// Header carrying the caller-supplied key (keeps it out of URLs and logs).
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Blocking HTTP client for the generative-language REST API.
pub struct GeminiClient {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiClient {
    /// Create a client for `base_url` with an explicit key.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, ProviderError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Build from provider config, resolving the key from the explicit value
    /// or the environment.
    pub fn from_config(
        provider: &ProviderConfig,
        explicit_key: Option<&str>,
    ) -> Result<Self, ProviderError> {
        let key = config::resolve_api_key(explicit_key).ok_or(ProviderError::MissingApiKey)?;
        Self::new(&provider.base_url, &key, provider.timeout_secs)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_connect() {
            ProviderError::Connection(self.base_url.clone())
        } else if e.is_timeout() {
            ProviderError::Timeout(self.timeout_secs)
        } else {
            ProviderError::HttpClient(e.to_string())
        }
    }
}

/// Map a non-success HTTP response to a typed error.
///
/// For generation calls, 404/400 (or the provider's `NOT_FOUND` /
/// `INVALID_ARGUMENT` status) means this model cannot serve the request.
pub(crate) fn classify_failure(model: Option<&str>, status: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<WireErrorEnvelope>(body)
        .ok()
        .map(|env| env.error);

    let message = parsed
        .as_ref()
        .map(|e| e.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    let provider_status = parsed.and_then(|e| e.status);
    let unavailable = matches!(status, 400 | 404)
        || matches!(
            provider_status.as_deref(),
            Some("NOT_FOUND") | Some("INVALID_ARGUMENT")
        );

    match model {
        Some(model) if unavailable => ProviderError::ModelUnavailable {
            model: model.to_string(),
            status,
            message,
        },
        _ => ProviderError::Status { status, message },
    }
}

impl LlmClient for GeminiClient {
    fn generate(
        &self,
        model: &ModelCandidate,
        request: &GenerateRequest,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, model.api_version, model.name
        );
        let body = WireGenerateRequest::from(request);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(Some(&model.name), status.as_u16(), &body));
        }

        let parsed: WireGenerateResponse = response
            .json()
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

        match parsed.first_text() {
            Some(text) => Ok(text),
            None => match parsed.block_reason() {
                Some(reason) => Err(ProviderError::Blocked(reason.to_string())),
                None => Ok(String::new()),
            },
        }
    }

    fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/{}/models", self.base_url, LIST_API_VERSION);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_failure(None, status.as_u16(), &body));
        }

        let parsed: WireModelList = response
            .json()
            .map_err(|e| ProviderError::ResponseParsing(e.to_string()))?;

        Ok(parsed
            .models
            .into_iter()
            .map(|m| m.name.trim_start_matches("models/").to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use crate::test_support::spawn_stub;

    async fn generate_stub(
        Path(action): Path<String>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> axum::response::Response {
        if headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) != Some("test-key") {
            return (StatusCode::FORBIDDEN, "bad key").into_response();
        }
        match action.as_str() {
            "gemini-2.0-flash:generateContent" => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": {"code": 404, "message": "models/gemini-2.0-flash is not found", "status": "NOT_FOUND"}})),
            )
                .into_response(),
            "busy-model:generateContent" => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}})),
            )
                .into_response(),
            "silent-model:generateContent" => Json(json!({"candidates": []})).into_response(),
            _ => {
                let echoed = body["contents"][0]["parts"][0]["text"].as_str().unwrap_or("").to_string();
                Json(json!({"candidates": [{"content": {"role": "model", "parts": [{"text": format!("echo: {echoed}")}]}}]}))
                    .into_response()
            }
        }
    }

    async fn list_stub() -> Json<serde_json::Value> {
        Json(json!({"models": [{"name": "models/gemini-flash-latest"}, {"name": "models/gemini-pro-latest"}]}))
    }

    fn stub_client() -> GeminiClient {
        let router = Router::new()
            .route("/v1beta/models", get(list_stub))
            .route("/v1beta/models/:action", post(generate_stub));
        let addr = spawn_stub(router);
        GeminiClient::new(&format!("http://{addr}/"), "test-key", 5).unwrap()
    }

    #[test]
    fn blank_key_is_rejected_before_network() {
        let err = GeminiClient::new("http://localhost:1", "  ", 5).err().unwrap();
        assert_eq!(err, ProviderError::MissingApiKey);
    }

    #[test]
    fn constructor_trims_trailing_slash() {
        let client = GeminiClient::new("https://example.com/", "k", 10).unwrap();
        assert_eq!(client.base_url, "https://example.com");
        assert_eq!(client.timeout_secs, 10);
    }

    #[test]
    fn generate_returns_candidate_text() {
        let client = stub_client();
        let text = client
            .generate(
                &ModelCandidate::new("gemini-flash-latest", "v1beta"),
                &GenerateRequest::prompt("hi"),
            )
            .unwrap();
        assert_eq!(text, "echo: hi");
    }

    #[test]
    fn not_found_is_model_unavailable() {
        let client = stub_client();
        let err = client
            .generate(
                &ModelCandidate::new("gemini-2.0-flash", "v1beta"),
                &GenerateRequest::prompt("hi"),
            )
            .unwrap_err();
        assert!(err.is_model_unavailable());
        assert!(err.to_string().contains("gemini-2.0-flash"));
    }

    #[test]
    fn quota_error_is_not_model_unavailable() {
        let client = stub_client();
        let err = client
            .generate(
                &ModelCandidate::new("busy-model", "v1beta"),
                &GenerateRequest::prompt("hi"),
            )
            .unwrap_err();
        assert!(!err.is_model_unavailable());
        assert_eq!(
            err,
            ProviderError::Status {
                status: 429,
                message: "quota".into()
            }
        );
    }

    #[test]
    fn no_candidates_yields_empty_text() {
        let client = stub_client();
        let text = client
            .generate(
                &ModelCandidate::new("silent-model", "v1beta"),
                &GenerateRequest::prompt("hi"),
            )
            .unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn list_models_strips_prefix() {
        let client = stub_client();
        let models = client.list_models().unwrap();
        assert_eq!(models, vec!["gemini-flash-latest", "gemini-pro-latest"]);
    }

    #[test]
    fn unreachable_host_is_connection_error() {
        let client = GeminiClient::new("http://127.0.0.1:9", "k", 2).unwrap();
        let err = client.list_models().unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Connection(_) | ProviderError::HttpClient(_) | ProviderError::Timeout(_)
        ));
    }

    #[test]
    fn classify_plain_text_body() {
        let err = classify_failure(Some("m"), 400, "Bad Request");
        assert_eq!(
            err,
            ProviderError::ModelUnavailable {
                model: "m".into(),
                status: 400,
                message: "Bad Request".into()
            }
        );
        let err = classify_failure(None, 404, "");
        assert!(matches!(err, ProviderError::Status { status: 404, .. }));
    }
}
