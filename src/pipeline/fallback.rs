//! Sequential model fallback.
//!
//! Candidates are tried strictly in order, one at a time. A model-unavailable
//! failure advances to the next candidate; any other failure aborts. When every
//! candidate is unavailable the runner logs which models the key can actually
//! reach and returns a single `Exhausted` error.

use super::provider::LlmClient;
use super::PipelineError;
use crate::config::ModelCandidate;

pub struct FallbackRunner<'a> {
    client: &'a dyn LlmClient,
    candidates: &'a [ModelCandidate],
}

impl<'a> FallbackRunner<'a> {
    pub fn new(client: &'a dyn LlmClient, candidates: &'a [ModelCandidate]) -> Self {
        Self { client, candidates }
    }

    /// Run `action` against each candidate until one succeeds.
    pub fn run<T, F>(&self, mut action: F) -> Result<T, PipelineError>
    where
        F: FnMut(&dyn LlmClient, &ModelCandidate) -> Result<T, PipelineError>,
    {
        if self.candidates.is_empty() {
            return Err(PipelineError::NoCandidates);
        }

        let mut last_error: Option<PipelineError> = None;

        for (idx, candidate) in self.candidates.iter().enumerate() {
            match action(self.client, candidate) {
                Ok(value) => {
                    if idx > 0 {
                        tracing::info!(
                            model = %candidate.name,
                            attempt = idx + 1,
                            "Fallback model succeeded"
                        );
                    }
                    return Ok(value);
                }
                Err(e) if e.is_model_unavailable() => {
                    tracing::warn!(
                        model = %candidate.name,
                        api_version = %candidate.api_version,
                        error = %e,
                        "Model unavailable, trying next candidate"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        diagnose_connection(self.client);

        Err(PipelineError::Exhausted {
            attempts: self.candidates.len(),
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown".into()),
        })
    }
}

/// Log the models available to the configured key. Never fails; returns the
/// list when it could be fetched.
pub fn diagnose_connection(client: &dyn LlmClient) -> Option<Vec<String>> {
    tracing::info!("Diagnostic: listing models available to this API key");
    match client.list_models() {
        Ok(models) if models.is_empty() => {
            tracing::warn!("Diagnostic: provider returned no models for this key");
            Some(models)
        }
        Ok(models) => {
            tracing::warn!(
                available = ?models,
                "Diagnostic: none of the configured candidates answered; update the candidate list to one of these"
            );
            Some(models)
        }
        Err(e) => {
            tracing::error!(error = %e, "Diagnostic: model listing failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::known_models;
    use crate::pipeline::provider::mock::{not_found, ScriptedLlmClient};
    use crate::pipeline::provider::{GenerateRequest, ProviderError};

    fn generate_text(
        client: &dyn LlmClient,
        model: &ModelCandidate,
    ) -> Result<String, PipelineError> {
        Ok(client.generate(model, &GenerateRequest::prompt("ping"))?)
    }

    #[test]
    fn first_success_stops_the_loop() {
        let candidates = known_models();
        let client = ScriptedLlmClient::new(vec![
            Err(not_found("gemini-2.0-flash")),
            Err(not_found("gemini-flash-latest")),
            Ok("pong".into()),
            Ok("never".into()),
        ]);
        let runner = FallbackRunner::new(&client, &candidates);

        let out = runner.run(generate_text).unwrap();

        assert_eq!(out, "pong");
        assert_eq!(
            client.invoked_models(),
            vec!["gemini-2.0-flash", "gemini-flash-latest", "gemini-pro-latest"]
        );
        assert_eq!(client.list_call_count(), 0);
    }

    #[test]
    fn all_unavailable_raises_one_aggregate_error() {
        let candidates = known_models();
        let client = ScriptedLlmClient::new(vec![Err(not_found("any"))]);
        let runner = FallbackRunner::new(&client, &candidates);

        let err = runner.run(generate_text).unwrap_err();

        assert_eq!(client.invoked_models().len(), candidates.len());
        match err {
            PipelineError::Exhausted { attempts, last_error } => {
                assert_eq!(attempts, 4);
                assert!(last_error.contains("not found"));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(client.list_call_count(), 1);
    }

    #[test]
    fn fatal_error_aborts_immediately() {
        let candidates = known_models();
        let client = ScriptedLlmClient::new(vec![
            Err(ProviderError::Status {
                status: 429,
                message: "quota".into(),
            }),
            Ok("never".into()),
        ]);
        let runner = FallbackRunner::new(&client, &candidates);

        let err = runner.run(generate_text).unwrap_err();

        assert_eq!(client.invoked_models(), vec!["gemini-2.0-flash"]);
        assert!(matches!(err, PipelineError::Provider(ProviderError::Status { status: 429, .. })));
    }

    #[test]
    fn action_errors_abort_too() {
        let candidates = known_models();
        let client = ScriptedLlmClient::replying("no json here");
        let runner = FallbackRunner::new(&client, &candidates);

        let err = runner
            .run(|c, m| {
                let _ = c.generate(m, &GenerateRequest::prompt("x"))?;
                Err::<(), _>(PipelineError::MalformedResponse("No JSON found".into()))
            })
            .unwrap_err();

        assert_eq!(client.invoked_models().len(), 1);
        assert!(matches!(err, PipelineError::MalformedResponse(_)));
    }

    #[test]
    fn empty_candidate_list_is_rejected() {
        let client = ScriptedLlmClient::replying("x");
        let runner = FallbackRunner::new(&client, &[]);
        assert_eq!(runner.run(generate_text).unwrap_err(), PipelineError::NoCandidates);
    }

    #[test]
    fn diagnostics_swallow_listing_failure() {
        let client = ScriptedLlmClient::replying("x").with_models(Err(ProviderError::Status {
            status: 403,
            message: "API key not valid".into(),
        }));
        assert!(diagnose_connection(&client).is_none());

        let candidates = vec![ModelCandidate::new("only", "v1beta")];
        let client = ScriptedLlmClient::new(vec![Err(not_found("only"))])
            .with_models(Err(ProviderError::Connection("x".into())));
        let err = FallbackRunner::new(&client, &candidates)
            .run(generate_text)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Exhausted { attempts: 1, .. }));
    }
}
