//! Ingestion: chunk a document, embed the chunks, store them in the index.

use std::path::Path;
use std::sync::Arc;

use super::chunker::Chunker;
use super::types::ChunkMetadata;
use crate::embedding::EmbeddingService;
use crate::error::PipelineResult;
use crate::index::VectorIndex;

/// Drives a document from raw text into the vector index.
pub struct IngestionPipeline {
    chunker: Box<dyn Chunker>,
    embeddings: EmbeddingService,
    index: Arc<VectorIndex>,
}

impl std::fmt::Debug for IngestionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionPipeline")
            .field("embeddings", &self.embeddings)
            .field("index", &self.index)
            .finish()
    }
}

impl IngestionPipeline {
    pub fn new(
        chunker: Box<dyn Chunker>,
        embeddings: EmbeddingService,
        index: Arc<VectorIndex>,
    ) -> Self {
        Self {
            chunker,
            embeddings,
            index,
        }
    }

    pub fn index(&self) -> &Arc<VectorIndex> {
        &self.index
    }

    /// Chunk, embed and store one document's text.
    ///
    /// Returns the number of chunks stored. A document that yields no chunks
    /// leaves the index untouched. If embedding fails nothing is written.
    pub async fn ingest(
        &self,
        text: &str,
        module_id: &str,
        document_id: &str,
    ) -> PipelineResult<usize> {
        let chunks = self.chunker.chunk(text);
        if chunks.is_empty() {
            tracing::info!(target: "ingest", "document {document_id} produced no chunks");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = self.embeddings.embed_batch(&texts).await?;

        let ids: Vec<String> = chunks
            .iter()
            .map(|c| ChunkMetadata::entry_id(document_id, c.index))
            .collect();
        let metadatas: Vec<ChunkMetadata> = chunks
            .iter()
            .map(|c| ChunkMetadata::for_chunk(c, module_id, document_id))
            .collect();

        self.index.add(&ids, &texts, &vectors, &metadatas)?;

        tracing::info!(
            target: "ingest",
            "stored {} chunks for document {document_id} in module {module_id}",
            chunks.len()
        );
        Ok(chunks.len())
    }

    /// Read a UTF-8 text file and ingest it.
    pub async fn ingest_file(
        &self,
        path: &Path,
        module_id: &str,
        document_id: &str,
    ) -> PipelineResult<usize> {
        let text = tokio::fs::read_to_string(path).await?;
        tracing::debug!(
            target: "ingest",
            "read {} bytes from {}",
            text.len(),
            path.display()
        );
        self.ingest(&text, module_id, document_id).await
    }

    /// Remove all chunks of a document. Deleting an unknown document is a no-op.
    pub fn delete_document(&self, document_id: &str) -> PipelineResult<usize> {
        let removed = self.index.delete_by_document(document_id)?;
        tracing::info!(target: "ingest", "removed {removed} chunks for document {document_id}");
        Ok(removed)
    }

    /// Remove all chunks of a module.
    pub fn delete_module(&self, module_id: &str) -> PipelineResult<usize> {
        let removed = self.index.delete_by_module(module_id)?;
        tracing::info!(target: "ingest", "removed {removed} chunks for module {module_id}");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{ChunkingConfig, StructuredChunker};
    use crate::embedding::EmbeddingProvider;
    use crate::error::{PipelineError, ProviderError};
    use async_trait::async_trait;

    /// Vector of (length, vowel count, 1).
    struct ShapeEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShapeEmbedder {
        fn model_name(&self) -> &str {
            "shape"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let vowels = t.chars().filter(|c| "aeiou".contains(*c)).count();
                    vec![t.len() as f32, vowels as f32, 1.0]
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn model_name(&self) -> &str {
            "failing"
        }

        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Err(ProviderError::Backend("quota exceeded".to_string()))
        }
    }

    fn pipeline(provider: Arc<dyn EmbeddingProvider>) -> IngestionPipeline {
        IngestionPipeline::new(
            Box::new(StructuredChunker::new(ChunkingConfig::new(200, 20))),
            EmbeddingService::new(provider),
            Arc::new(VectorIndex::in_memory().unwrap()),
        )
    }

    const TEXT: &str = "Chapter 1: Ratios\nA ratio compares two quantities.\n\
        Section 1.1: Rates\nA rate is a ratio with different units.";

    #[tokio::test]
    async fn test_ingest_stores_every_chunk() {
        let pipeline = pipeline(Arc::new(ShapeEmbedder));

        let stored = pipeline.ingest(TEXT, "ratios", "doc-1").await.unwrap();
        assert_eq!(stored, 2);
        assert_eq!(pipeline.index().count(Some("ratios")).unwrap(), 2);
        assert_eq!(pipeline.index().count_by_document("doc-1").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_document_is_a_noop() {
        let pipeline = pipeline(Arc::new(ShapeEmbedder));
        assert_eq!(pipeline.ingest("  \n\n ", "m", "d").await.unwrap(), 0);
        assert_eq!(pipeline.index().count(None).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        let pipeline = pipeline(Arc::new(FailingEmbedder));

        let err = pipeline.ingest(TEXT, "ratios", "doc-1").await.unwrap_err();
        assert!(matches!(err, PipelineError::Provider(_)));
        assert_eq!(pipeline.index().count(None).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reingest_replaces_entries() {
        let pipeline = pipeline(Arc::new(ShapeEmbedder));
        pipeline.ingest(TEXT, "ratios", "doc-1").await.unwrap();
        pipeline.ingest(TEXT, "ratios", "doc-1").await.unwrap();
        assert_eq!(pipeline.index().count(None).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_document_and_module() {
        let pipeline = pipeline(Arc::new(ShapeEmbedder));
        pipeline.ingest(TEXT, "ratios", "doc-1").await.unwrap();
        pipeline.ingest(TEXT, "ratios", "doc-2").await.unwrap();
        pipeline.ingest(TEXT, "angles", "doc-3").await.unwrap();

        assert_eq!(pipeline.delete_document("doc-1").unwrap(), 2);
        assert_eq!(pipeline.delete_document("doc-1").unwrap(), 0);
        assert_eq!(pipeline.delete_module("ratios").unwrap(), 2);
        assert_eq!(pipeline.index().count(None).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_ingest_missing_file() {
        let pipeline = pipeline(Arc::new(ShapeEmbedder));
        let err = pipeline
            .ingest_file(Path::new("/definitely/not/here.txt"), "m", "d")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
