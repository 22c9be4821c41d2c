use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

static URL_INPUT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://\S+$").unwrap());

/// True when the whole (trimmed) input is a single http(s) URL.
pub fn is_url(input: &str) -> bool {
    URL_INPUT.is_match(input.trim())
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Proxy status: {0}")]
    Status(u16),

    #[error("Proxy transport error: {0}")]
    Transport(String),

    #[error("Invalid proxy endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Retrieves the rendered text of a listing page.
pub trait PageFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches pages through the same-origin proxy (`GET <endpoint>?url=<target>`).
pub struct HttpProxyFetcher {
    endpoint: reqwest::Url,
    client: reqwest::blocking::Client,
}

impl HttpProxyFetcher {
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, FetchError> {
        let endpoint = reqwest::Url::parse(endpoint)
            .map_err(|e| FetchError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self { endpoint, client })
    }

    /// Proxy request URL for `target`, with the target percent-encoded.
    pub fn request_url(&self, target: &str) -> reqwest::Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().clear().append_pair("url", target);
        url
    }
}

impl PageFetcher for HttpProxyFetcher {
    fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let request_url = self.request_url(url);
        tracing::debug!(target_url = %url, "Routing listing fetch through proxy");

        let response = self
            .client
            .get(request_url)
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response
            .text()
            .map_err(|e| FetchError::Transport(e.to_string()))
    }
}
