use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::fallback::FallbackRunner;
use super::provider::{Content, GenerateRequest, LlmClient, Part, Role};
use super::PipelineError;
use crate::config::ModelCandidate;

pub const TRANSCRIPTION_INSTRUCTION: &str =
    "STRICT TRANSCRIPTION: Convert this voice note to text without additions.";

pub const AUDIO_MIME_TYPE: &str = "audio/mp3";

pub struct Transcriber<'a> {
    llm: &'a dyn LlmClient,
    candidates: &'a [ModelCandidate],
}

impl<'a> Transcriber<'a> {
    pub fn new(llm: &'a dyn LlmClient, candidates: &'a [ModelCandidate]) -> Self {
        Self { llm, candidates }
    }

    /// Transcribe a base64-encoded voice note. Returns "" when the provider
    /// produced no text.
    pub fn transcribe_audio(&self, base64_audio: &str) -> Result<String, PipelineError> {
        let payload = base64_audio.trim();
        let decoded = STANDARD
            .decode(payload)
            .map_err(|e| PipelineError::InvalidAudio(e.to_string()))?;
        if decoded.is_empty() {
            return Err(PipelineError::InvalidAudio("empty audio payload".into()));
        }

        let span = tracing::info_span!("transcribe_audio", bytes = decoded.len());
        let _guard = span.enter();

        let request = GenerateRequest {
            system_instruction: None,
            contents: vec![Content {
                role: Role::User,
                parts: vec![
                    Part::InlineData {
                        mime_type: AUDIO_MIME_TYPE.to_string(),
                        data: payload.to_string(),
                    },
                    Part::Text(TRANSCRIPTION_INSTRUCTION.to_string()),
                ],
            }],
        };

        FallbackRunner::new(self.llm, self.candidates)
            .run(|llm, model| Ok(llm.generate(model, &request)?))
    }

    /// Same as `transcribe_audio` for raw bytes.
    pub fn transcribe_audio_bytes(&self, audio: &[u8]) -> Result<String, PipelineError> {
        self.transcribe_audio(&STANDARD.encode(audio))
    }
}
