use serde::{Deserialize, Serialize};

use super::ProviderError;
use crate::config::ModelCandidate;

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    Text(String),
    /// Base64 payload with its MIME type (audio notes, images).
    InlineData { mime_type: String, data: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user_text(text: &str) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::Text(text.to_string())],
        }
    }

    pub fn model_text(text: &str) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.to_string())],
        }
    }
}

/// Provider-agnostic generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// Single user prompt, no system instruction.
    pub fn prompt(text: &str) -> Self {
        Self {
            system_instruction: None,
            contents: vec![Content::user_text(text)],
        }
    }

    pub fn with_system(mut self, system: &str) -> Self {
        self.system_instruction = Some(system.to_string());
        self
    }

    /// Concatenated text of every text part, in order.
    pub fn text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Generative-language client abstraction (allows mocking).
pub trait LlmClient {
    /// Run one generation against a specific model candidate and return the
    /// reply text. An empty string means the provider produced no text.
    fn generate(
        &self,
        model: &ModelCandidate,
        request: &GenerateRequest,
    ) -> Result<String, ProviderError>;

    /// Model identifiers available to the configured key.
    fn list_models(&self) -> Result<Vec<String>, ProviderError>;
}
