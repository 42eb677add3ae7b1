//! Text embedding for chunks and queries.
//!
//! `EmbeddingProvider` is the seam to the actual model (local fastembed or a
//! remote OpenAI-compatible endpoint). `EmbeddingService` sits on top and owns
//! request batching and result-count checks.

mod local;
mod openai;

pub use self::local::{FastEmbedProvider, models_dir};
pub use self::openai::OpenAiEmbedder;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::ProviderError;

/// Default number of texts sent per provider request.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A model that maps texts to fixed-dimension vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Human-readable model name for logs.
    fn model_name(&self) -> &str;

    /// Embed one request's worth of texts, returning one vector per input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Batching front-end over an [`EmbeddingProvider`].
#[derive(Clone)]
pub struct EmbeddingService {
    provider: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
}

impl std::fmt::Debug for EmbeddingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingService")
            .field("model", &self.provider.model_name())
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl EmbeddingService {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the request batch size (clamped to at least 1).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Build the provider named in settings and wrap it.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, ProviderError> {
        let provider: Arc<dyn EmbeddingProvider> = match config.provider {
            EmbeddingBackend::FastEmbed => Arc::new(FastEmbedProvider::from_name(&config.model)?),
            EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedder::from_env(
                &config.endpoint,
                &config.model,
                &config.api_key_env,
                Duration::from_secs(config.timeout_secs),
            )?),
        };
        Ok(Self::new(provider).with_batch_size(config.batch_size))
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    /// Embed a single text.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.request(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or(ProviderError::CountMismatch {
                expected: 1,
                actual: 0,
            })
    }

    /// Embed many texts, preserving input order and length.
    ///
    /// Requests go out sequentially in groups of `batch_size`; there is no
    /// retry here.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        let total_batches = texts.len().div_ceil(self.batch_size);

        for (i, batch) in texts.chunks(self.batch_size).enumerate() {
            tracing::debug!(
                target: "embedding",
                "batch {}/{} ({} texts) via {}",
                i + 1,
                total_batches,
                batch.len(),
                self.provider.model_name()
            );
            vectors.extend(self.request(batch).await?);
        }

        Ok(vectors)
    }

    async fn request(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let vectors = self.provider.embed(batch).await?;
        if vectors.len() != batch.len() {
            return Err(ProviderError::CountMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            });
        }
        Ok(vectors)
    }
}
