//! Tutoring turn: ground, answer, validate, gate.

use serde::Serialize;
use std::sync::Arc;

use crate::config::TutorConfig;
use crate::error::PipelineResult;
use crate::llm::{ChatMessage, ChatProvider, ChatRequest};
use crate::retrieval::{ModuleScope, Retriever};
use crate::validation::{AnswerGate, ResponseValidator, Verdict};

/// Result of one tutoring turn.
#[derive(Debug, Clone, Serialize)]
pub struct TutorReply {
    /// What the student sees.
    pub answer: String,
    /// The model's answer before gating.
    pub raw_answer: String,
    /// Grounding context that went into the prompt.
    pub context: String,
    /// `None` when validation is disabled.
    pub verdict: Option<Verdict>,
}

pub struct Tutor {
    retriever: Retriever,
    provider: Arc<dyn ChatProvider>,
    config: TutorConfig,
    validator: Option<ResponseValidator>,
    gate: AnswerGate,
}

impl std::fmt::Debug for Tutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tutor")
            .field("model", &self.config.model)
            .field("retriever", &self.retriever)
            .field("validator", &self.validator)
            .finish()
    }
}

impl Tutor {
    pub fn new(retriever: Retriever, provider: Arc<dyn ChatProvider>, config: TutorConfig) -> Self {
        Self {
            retriever,
            provider,
            config,
            validator: None,
            gate: AnswerGate::default(),
        }
    }

    /// Enable answer validation.
    pub fn with_validator(mut self, validator: ResponseValidator, gate: AnswerGate) -> Self {
        self.validator = Some(validator);
        self.gate = gate;
        self
    }

    pub async fn ask(&self, question: &str, scope: &ModuleScope) -> PipelineResult<TutorReply> {
        self.ask_with_history(question, &[], scope).await
    }

    /// Answer `question` given earlier turns of the conversation.
    ///
    /// Retrieval and generation errors propagate. Validation errors do not:
    /// the gate releases the answer under a degraded verdict.
    pub async fn ask_with_history(
        &self,
        question: &str,
        history: &[ChatMessage],
        scope: &ModuleScope,
    ) -> PipelineResult<TutorReply> {
        let context = self.retriever.build_context(question, scope, None).await?;

        let request = ChatRequest::new(&self.config.model, self.messages(&context, history, question))
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);
        let raw_answer = self.provider.generate(&request).await?;

        tracing::debug!(
            target: "tutor",
            "{} answered with {} chars (context {} chars)",
            self.config.model,
            raw_answer.len(),
            context.len()
        );

        let Some(validator) = &self.validator else {
            return Ok(TutorReply {
                answer: raw_answer.clone(),
                raw_answer,
                context,
                verdict: None,
            });
        };

        let outcome = validator.validate(question, &raw_answer).await;
        let gated = self.gate.apply(&raw_answer, outcome);

        tracing::info!(
            target: "tutor",
            "answer {} ({})",
            if gated.refused { "refused" } else { "released" },
            gated.verdict.explanation
        );

        Ok(TutorReply {
            answer: gated.answer,
            raw_answer,
            context,
            verdict: Some(gated.verdict),
        })
    }

    fn messages(&self, context: &str, history: &[ChatMessage], question: &str) -> Vec<ChatMessage> {
        let system = if context.is_empty() {
            self.config.system_prompt.clone()
        } else {
            format!("{}\n\n{context}", self.config.system_prompt)
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(question));
        messages
    }
}
