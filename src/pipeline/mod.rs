pub mod concierge;
pub mod fallback;
pub mod ingestion;
pub mod normalize;
pub mod provider;
pub mod transcription;

use thiserror::Error;

use provider::ProviderError;

/// Failures of the AI pipeline (extraction, concierge chat, transcription).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("All {attempts} models failed. Last error: {last_error}")]
    Exhausted { attempts: usize, last_error: String },

    #[error("No model candidates configured")]
    NoCandidates,

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("JSON parsing error: {0}")]
    JsonParsing(String),

    #[error("Conversation history must end with a user turn")]
    EmptyHistory,

    #[error("Audio payload is not valid base64: {0}")]
    InvalidAudio(String),

    #[error("Input is empty")]
    EmptyInput,
}

impl PipelineError {
    /// Recoverable by advancing to the next model candidate.
    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, PipelineError::Provider(e) if e.is_model_unavailable())
    }

    /// Short text suitable for an alert in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            PipelineError::Provider(ProviderError::MissingApiKey) => {
                "Missing Google API key. Add it in Settings or your environment."
            }
            PipelineError::MalformedResponse(_) | PipelineError::JsonParsing(_) => {
                "Sync failed: the AI response could not be read. Please try again."
            }
            PipelineError::Exhausted { .. } | PipelineError::NoCandidates => {
                "Extraction failed: no AI model is currently available."
            }
            PipelineError::EmptyHistory | PipelineError::EmptyInput => {
                "Nothing to send. Please enter a message or listing text."
            }
            PipelineError::InvalidAudio(_) => "The voice note could not be read.",
            PipelineError::Provider(_) => "Extraction failed: the AI service returned an error.",
        }
    }
}
