pub mod gemini;
pub mod gemini_types;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use gemini::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Missing Google API key. Pass one explicitly or set VITE_GOOGLE_API_KEY")]
    MissingApiKey,

    #[error("Provider is not reachable at {0}")]
    Connection(String),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model {model} unavailable (status {status}): {message}")]
    ModelUnavailable {
        model: String,
        status: u16,
        message: String,
    },

    #[error("Provider returned error (status {status}): {message}")]
    Status { status: u16, message: String },

    #[error("Response blocked by provider: {0}")]
    Blocked(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl ProviderError {
    /// A model-unavailable failure is recoverable by trying the next candidate.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, ProviderError::ModelUnavailable { .. })
    }
}
