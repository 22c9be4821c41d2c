use serde::{Deserialize, Serialize};

use super::prompt::build_system_instruction;
use crate::config::ModelCandidate;
use crate::models::{AgentSettings, PropertyRecord};
use crate::pipeline::fallback::FallbackRunner;
use crate::pipeline::provider::{Content, GenerateRequest, LlmClient, Role};
use crate::pipeline::PipelineError;

/// One turn of the visitor's conversation with the concierge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            text: text.to_string(),
        }
    }

    pub fn model(text: &str) -> Self {
        Self {
            role: Role::Model,
            text: text.to_string(),
        }
    }
}

pub struct ConciergeChat<'a> {
    llm: &'a dyn LlmClient,
    candidates: &'a [ModelCandidate],
}

impl<'a> ConciergeChat<'a> {
    pub fn new(llm: &'a dyn LlmClient, candidates: &'a [ModelCandidate]) -> Self {
        Self { llm, candidates }
    }

    /// Send the latest user turn against the preceding history and return
    /// the model's reply unmodified.
    ///
    /// Turn-taking rules (lead-capture pivot, fuzzy matching) live in the
    /// system instruction; nothing here inspects the conversation.
    pub fn chat_with_guard(
        &self,
        history: &[ChatTurn],
        property: &PropertyRecord,
        settings: &AgentSettings,
    ) -> Result<String, PipelineError> {
        match history.last() {
            Some(turn) if turn.role == Role::User && !turn.text.trim().is_empty() => {}
            _ => return Err(PipelineError::EmptyHistory),
        }

        let span = tracing::info_span!(
            "concierge_chat",
            property_id = %property.property_id,
            turns = history.len()
        );
        let _guard = span.enter();

        let request = GenerateRequest {
            system_instruction: Some(build_system_instruction(settings, property)?),
            contents: history
                .iter()
                .map(|turn| match turn.role {
                    Role::User => Content::user_text(&turn.text),
                    Role::Model => Content::model_text(&turn.text),
                })
                .collect(),
        };

        let reply = FallbackRunner::new(self.llm, self.candidates)
            .run(|llm, model| Ok(llm.generate(model, &request)?))?;

        tracing::debug!(chars = reply.len(), "Concierge replied");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::known_models;
    use crate::models::seed_portfolio;
    use crate::pipeline::provider::mock::{not_found, ScriptedLlmClient};
    use crate::pipeline::provider::Part;

    fn history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("What is the asking price?"),
            ChatTurn::model("The Glass House is offered at $18,500,000."),
            ChatTurn::user("Is there a gym nearby?"),
        ]
    }

    #[test]
    fn sends_history_with_grounded_system_prompt() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying("  There is a Fitness Center on site.\n");
        let chat = ConciergeChat::new(&llm, &candidates);
        let property = seed_portfolio().remove(0);

        let reply = chat
            .chat_with_guard(&history(), &property, &AgentSettings::default())
            .unwrap();

        // returned verbatim, whitespace included
        assert_eq!(reply, "  There is a Fitness Center on site.\n");

        let request = llm.last_request().unwrap();
        let system = request.system_instruction.unwrap();
        assert!(system.contains("EstateGuard Concierge"));
        assert!(system.contains("\"property_id\": \"EG-770\""));

        let roles: Vec<Role> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Model, Role::User]);
        assert_eq!(
            request.contents[2].parts,
            vec![Part::Text("Is there a gym nearby?".into())]
        );
    }

    #[test]
    fn history_must_end_with_user_turn() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::replying("x");
        let chat = ConciergeChat::new(&llm, &candidates);
        let property = seed_portfolio().remove(0);
        let settings = AgentSettings::default();

        assert_eq!(
            chat.chat_with_guard(&[], &property, &settings).unwrap_err(),
            PipelineError::EmptyHistory
        );
        assert_eq!(
            chat.chat_with_guard(&[ChatTurn::model("Hello")], &property, &settings)
                .unwrap_err(),
            PipelineError::EmptyHistory
        );
        assert!(llm.invoked_models().is_empty());
    }

    #[test]
    fn chat_uses_fallback_runner() {
        let candidates = known_models();
        let llm = ScriptedLlmClient::new(vec![
            Err(not_found("gemini-2.0-flash")),
            Ok("Welcome.".into()),
        ]);
        let chat = ConciergeChat::new(&llm, &candidates);

        let reply = chat
            .chat_with_guard(
                &[ChatTurn::user("Hi")],
                &seed_portfolio().remove(1),
                &AgentSettings::default(),
            )
            .unwrap();

        assert_eq!(reply, "Welcome.");
        assert_eq!(llm.invoked_models().len(), 2);
    }
}
