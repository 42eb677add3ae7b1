use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::rubric::{classify, judge_prompt};
use super::{Verdict, Vote, VoteResult};
use crate::config::ValidationConfig;
use crate::error::{ProviderError, ValidationError};
use crate::llm::{ChatMessage, ChatProvider, ChatRequest, OpenAiChatClient};

/// Judge models used when none are configured explicitly.
pub const DEFAULT_VALIDATORS: [&str; 2] = ["meta-llama-3.1-8b-instruct", "gpt-4.1-mini"];

/// Queries each judge model concurrently and reduces the votes.
#[derive(Clone)]
pub struct ResponseValidator {
    provider: Arc<dyn ChatProvider>,
    validators: Vec<String>,
    timeout: Duration,
    temperature: f32,
    max_tokens: usize,
}

impl std::fmt::Debug for ResponseValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseValidator")
            .field("validators", &self.validators)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ResponseValidator {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            validators: DEFAULT_VALIDATORS.iter().map(|m| m.to_string()).collect(),
            timeout: Duration::from_secs(60),
            temperature: 0.3,
            max_tokens: 10,
        }
    }

    /// Build a validator talking to the configured endpoint.
    pub fn from_config(config: &ValidationConfig) -> Result<Self, ProviderError> {
        let client = OpenAiChatClient::from_env(
            &config.endpoint,
            &config.api_key_env,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(Arc::new(client))
            .with_validators(config.validators.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens))
    }

    pub fn with_validators(mut self, validators: Vec<String>) -> Self {
        self.validators = validators;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn validators(&self) -> &[String] {
        &self.validators
    }

    /// Validate with the configured judges.
    pub async fn validate(&self, question: &str, answer: &str) -> Result<Verdict, ValidationError> {
        self.validate_with(question, answer, &self.validators).await
    }

    /// Validate with an explicit judge list.
    ///
    /// All judges are queried at once and every call settles (reply, error or
    /// timeout) before the votes are reduced.
    pub async fn validate_with(
        &self,
        question: &str,
        answer: &str,
        validators: &[String],
    ) -> Result<Verdict, ValidationError> {
        if validators.is_empty() {
            return Err(ValidationError::NoValidators);
        }

        let prompt = judge_prompt(question, answer);
        let judgements = validators.iter().map(|model| self.judge(model, &prompt));
        let outcomes = join_all(judgements).await;

        let mut votes = Vec::with_capacity(validators.len());
        let mut errors = Vec::new();
        for (model, outcome) in validators.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(target: "validation", "judge {model} failed: {e}");
                    errors.push(format!("{model}: {e}"));
                    VoteResult::Error
                }
            };
            votes.push(Vote {
                model: model.clone(),
                result,
            });
        }

        let verdict = Verdict::from_votes(votes, errors);
        tracing::info!(
            target: "validation",
            "verdict is_safe={} ({})",
            verdict.is_safe,
            verdict.explanation
        );
        Ok(verdict)
    }

    async fn judge(&self, model: &str, prompt: &str) -> Result<VoteResult, ProviderError> {
        let request = ChatRequest::new(model, vec![ChatMessage::user(prompt)])
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let reply = tokio::time::timeout(self.timeout, self.provider.generate(&request))
            .await
            .map_err(|_| ProviderError::Timeout {
                model: model.to_string(),
                seconds: self.timeout.as_secs(),
            })??;

        tracing::debug!(target: "validation", "judge {model} replied {:?}", reply.trim());
        classify(&reply)
    }
}
