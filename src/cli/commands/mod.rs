//! Command implementations for the CLI.
//!
//! Each command group lives in its own module. The helpers here build the
//! services a command needs from the loaded settings.

pub mod ask;
pub mod index;
pub mod init;
pub mod retrieve;

use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::embedding::EmbeddingService;
use crate::index::VectorIndex;
use crate::llm::OpenAiChatClient;
use crate::retrieval::Retriever;
use crate::validation::{AnswerGate, ResponseValidator};

pub(crate) fn open_index(settings: &Settings) -> Result<Arc<VectorIndex>> {
    let path = settings.resolved_index_path();
    let index = VectorIndex::open(&path)
        .with_context(|| format!("Failed to open index at {}", path.display()))?;
    Ok(Arc::new(index))
}

pub(crate) fn embedding_service(settings: &Settings) -> Result<EmbeddingService> {
    EmbeddingService::from_config(&settings.embedding).with_context(|| {
        format!(
            "Failed to set up embedding model {}",
            settings.embedding.model
        )
    })
}

pub(crate) fn retriever(settings: &Settings, index: Arc<VectorIndex>) -> Result<Retriever> {
    Ok(Retriever::new(embedding_service(settings)?, index).with_top_k(settings.retrieval.top_k))
}

pub(crate) fn validator(settings: &Settings) -> Result<(ResponseValidator, AnswerGate)> {
    let validator = ResponseValidator::from_config(&settings.validation)
        .context("Failed to set up validator client")?;
    let gate = AnswerGate::new(settings.validation.refusal_message.clone());
    Ok((validator, gate))
}

pub(crate) fn tutor_client(settings: &Settings) -> Result<Arc<OpenAiChatClient>> {
    let client = OpenAiChatClient::from_env(
        &settings.tutor.endpoint,
        &settings.tutor.api_key_env,
        Duration::from_secs(settings.tutor.timeout_secs),
    )
    .context("Failed to set up tutor client")?;
    Ok(Arc::new(client))
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| anyhow!(e))?;
    println!("{json}");
    Ok(())
}
