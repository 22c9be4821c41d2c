//! Wire format of the generative-language REST API.

use serde::{Deserialize, Serialize};

use super::types::{Content, GenerateRequest, Part};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<WireContent>,
    pub contents: Vec<WireContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<WirePart>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<WireInlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireInlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireGenerateResponse {
    #[serde(default)]
    pub candidates: Vec<WireCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<WirePromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireCandidate {
    #[serde(default)]
    pub content: Option<WireContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireModelList {
    #[serde(default)]
    pub models: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
pub struct WireModel {
    pub name: String,
}

/// Error envelope: `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`
#[derive(Debug, Deserialize)]
pub struct WireErrorEnvelope {
    pub error: WireError,
}

#[derive(Debug, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

fn to_wire_part(part: &Part) -> WirePart {
    match part {
        Part::Text(text) => WirePart {
            text: Some(text.clone()),
            inline_data: None,
        },
        Part::InlineData { mime_type, data } => WirePart {
            text: None,
            inline_data: Some(WireInlineData {
                mime_type: mime_type.clone(),
                data: data.clone(),
            }),
        },
    }
}

fn to_wire_content(content: &Content) -> WireContent {
    WireContent {
        role: Some(content.role.as_str().to_string()),
        parts: content.parts.iter().map(to_wire_part).collect(),
    }
}

impl From<&GenerateRequest> for WireGenerateRequest {
    fn from(req: &GenerateRequest) -> Self {
        Self {
            system_instruction: req.system_instruction.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(text.clone()),
                    inline_data: None,
                }],
            }),
            contents: req.contents.iter().map(to_wire_content).collect(),
        }
    }
}

impl WireGenerateResponse {
    /// Text of the first candidate, parts joined in order.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        Some(text)
    }

    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}
