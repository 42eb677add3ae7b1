//! Local embedding backend built on fastembed.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::EmbeddingProvider;
use crate::error::ProviderError;

/// Runs a fastembed ONNX model in-process.
///
/// Inference is CPU-bound, so each request hops onto the blocking pool.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    name: String,
}

impl FastEmbedProvider {
    /// Load a model by its settings name (e.g. `AllMiniLML6V2`).
    pub fn from_name(name: &str) -> Result<Self, ProviderError> {
        let model = parse_model(name)?;
        Self::with_model(model, name)
    }

    pub fn with_model(model: EmbeddingModel, name: &str) -> Result<Self, ProviderError> {
        let text_model = TextEmbedding::try_new(
            InitOptions::new(model)
                .with_cache_dir(models_dir())
                .with_show_download_progress(true),
        )
        .map_err(|e| ProviderError::Backend(e.to_string()))?;

        tracing::debug!(target: "embedding", "loaded fastembed model {name}");

        Ok(Self {
            model: Arc::new(Mutex::new(text_model)),
            name: name.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn model_name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| ProviderError::Backend("embedding model lock poisoned".to_string()))?;
            model
                .embed(texts, None)
                .map_err(|e| ProviderError::Backend(e.to_string()))
        })
        .await
        .map_err(|e| ProviderError::Backend(format!("embedding task failed: {e}")))?
    }
}

/// Where downloaded model files are cached.
pub fn models_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("teacherspet")
        .join("models")
}

fn parse_model(name: &str) -> Result<EmbeddingModel, ProviderError> {
    match name {
        "AllMiniLML6V2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" => Ok(EmbeddingModel::BGEBaseENV15),
        "MultilingualE5Small" => Ok(EmbeddingModel::MultilingualE5Small),
        other => Err(ProviderError::Unsupported(format!(
            "fastembed model {other}"
        ))),
    }
}
