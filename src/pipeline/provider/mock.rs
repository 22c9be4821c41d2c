use std::collections::VecDeque;
use std::sync::Mutex;

use super::types::{GenerateRequest, LlmClient};
use super::ProviderError;
use crate::config::ModelCandidate;

/// Mock LLM client for testing. Replays scripted results in order and
/// records every model it was asked to use.
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<(String, GenerateRequest)>>,
    available_models: Result<Vec<String>, ProviderError>,
    list_calls: Mutex<usize>,
}

impl ScriptedLlmClient {
    pub fn new(script: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            available_models: Ok(vec!["gemini-flash-latest".into()]),
            list_calls: Mutex::new(0),
        }
    }

    /// Always answers with `text`, whatever the model.
    pub fn replying(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub fn with_models(mut self, models: Result<Vec<String>, ProviderError>) -> Self {
        self.available_models = models;
        self
    }

    /// Model names in invocation order.
    pub fn invoked_models(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn last_request(&self) -> Option<GenerateRequest> {
        self.calls.lock().unwrap().last().map(|(_, r)| r.clone())
    }

    pub fn list_call_count(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }
}

/// Shorthand for a "model not found" failure.
pub fn not_found(model: &str) -> ProviderError {
    ProviderError::ModelUnavailable {
        model: model.to_string(),
        status: 404,
        message: format!("models/{model} is not found"),
    }
}

impl LlmClient for ScriptedLlmClient {
    fn generate(
        &self,
        model: &ModelCandidate,
        request: &GenerateRequest,
    ) -> Result<String, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.name.clone(), request.clone()));
        let mut script = self.script.lock().unwrap();
        // The final entry repeats once the script runs out.
        if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::Status { status: 500, message: "empty script".into() }))
        }
    }

    fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        *self.list_calls.lock().unwrap() += 1;
        self.available_models.clone()
    }
}
