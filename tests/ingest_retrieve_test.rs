//! End-to-end ingestion and retrieval against an on-disk index.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

use teacherspet::documents::ChunkingConfig;
use teacherspet::{
    EmbeddingProvider, EmbeddingService, IngestionPipeline, ModuleScope, ProviderError, Retriever,
    StructuredChunker, VectorIndex,
};

const DIMENSION: usize = 64;

/// Bag-of-words hashing embedder: identical texts embed identically.
#[derive(Default)]
struct HashingEmbedder {
    calls: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_name(&self) -> &str {
        "hashing"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| bag_of_words(t)).collect())
    }
}

fn bag_of_words(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0; DIMENSION];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.to_lowercase().hash(&mut hasher);
        vector[(hasher.finish() as usize) % DIMENSION] += 1.0;
    }
    vector
}

struct Fixture {
    pipeline: IngestionPipeline,
    retriever: Retriever,
    embedder: Arc<HashingEmbedder>,
}

fn fixture(index: Arc<VectorIndex>, config: ChunkingConfig, batch_size: usize) -> Fixture {
    let embedder = Arc::new(HashingEmbedder::default());
    let service = EmbeddingService::new(embedder.clone()).with_batch_size(batch_size);
    Fixture {
        pipeline: IngestionPipeline::new(
            Box::new(StructuredChunker::new(config)),
            service.clone(),
            index.clone(),
        ),
        retriever: Retriever::new(service, index),
        embedder,
    }
}

#[tokio::test]
async fn test_single_section_document_round_trip() {
    let temp = TempDir::new().unwrap();
    let index = Arc::new(VectorIndex::open(temp.path()).unwrap());
    let f = fixture(index, ChunkingConfig::default(), 100);

    let text = "Section 1.1: X\nParagraph A.\n\nParagraph B.";
    let stored = f.pipeline.ingest(text, "module-1", "doc-1").await.unwrap();
    assert_eq!(stored, 1);

    let results = f.retriever.retrieve(text, Some("module-1"), None).await.unwrap();
    assert_eq!(results.len(), 1);

    let hit = &results[0];
    assert_eq!(hit.id, "doc-1_chunk_0");
    assert_eq!(hit.content, text);
    assert_eq!(hit.metadata.section.as_deref(), Some("Section 1.1: X"));
    assert_eq!(hit.metadata.chapter, None);
    assert!(hit.distance.abs() < 1e-5, "distance {}", hit.distance);

    // Without a chapter the reference carries no label.
    let context = f
        .retriever
        .build_context(text, &ModuleScope::module("module-1"), None)
        .await
        .unwrap();
    assert!(context.contains(&format!("[Reference 1]\n{text}")));
}

#[tokio::test]
async fn test_module_filter_and_deletes() {
    let index = Arc::new(VectorIndex::in_memory().unwrap());
    let f = fixture(index.clone(), ChunkingConfig::default(), 100);

    let ratios = "Chapter 1: Ratios\nA ratio compares two quantities.\n\
                  Section 1.1: Rates\nA rate compares quantities with different units.";
    let angles = "Chapter 4: Angles\nAn angle is formed by two rays.";

    assert_eq!(f.pipeline.ingest(ratios, "ratios", "r-doc").await.unwrap(), 2);
    assert_eq!(f.pipeline.ingest(angles, "angles", "a-doc").await.unwrap(), 1);

    let results = f
        .retriever
        .retrieve("two quantities", Some("ratios"), Some(10))
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.metadata.module_id == "ratios"));
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));

    assert_eq!(f.pipeline.delete_document("r-doc").unwrap(), 2);
    assert_eq!(index.count_by_document("r-doc").unwrap(), 0);
    assert_eq!(f.pipeline.delete_document("r-doc").unwrap(), 0);

    let results = f
        .retriever
        .retrieve("two quantities", Some("ratios"), None)
        .await
        .unwrap();
    assert!(results.is_empty());
    assert_eq!(index.count(None).unwrap(), 1);
}

#[tokio::test]
async fn test_context_for_module_with_and_without_chunks() {
    let index = Arc::new(VectorIndex::in_memory().unwrap());
    let f = fixture(index, ChunkingConfig::default(), 100);

    let text = "Chapter 2: Fractions\nA fraction names part of a whole.";
    f.pipeline.ingest(text, "fractions", "f-doc").await.unwrap();

    let scope = ModuleScope::module("fractions").with_name("Fractions");
    let context = f
        .retriever
        .build_context("part of a whole", &scope, None)
        .await
        .unwrap();
    assert!(context.contains("[Reference 1 (Chapter 2: Fractions)]"));
    assert!(context.contains("A fraction names part of a whole."));

    let empty_scope = ModuleScope::module("decimals").with_name("Decimals");
    let context = f
        .retriever
        .build_context("part of a whole", &empty_scope, None)
        .await
        .unwrap();
    assert_eq!(context.matches("Decimals").count(), 2);
    assert!(!context.contains("[Reference"));
}

#[tokio::test]
async fn test_long_document_is_batched() {
    let index = Arc::new(VectorIndex::in_memory().unwrap());
    let f = fixture(index.clone(), ChunkingConfig::new(120, 20), 10);

    let paragraphs: Vec<String> = (0..60)
        .map(|i| format!("Paragraph {i} explains how to solve a one-step equation."))
        .collect();
    let text = paragraphs.join("\n\n");

    let stored = f.pipeline.ingest(&text, "equations", "eq-doc").await.unwrap();
    assert!(stored > 10);
    assert_eq!(index.count(Some("equations")).unwrap(), stored);
    assert_eq!(f.embedder.calls.load(Ordering::SeqCst), stored.div_ceil(10));
}

#[tokio::test]
async fn test_index_survives_reopen() {
    let temp = TempDir::new().unwrap();
    let text = "Unit 3 Geometry\nTriangles have three sides.";

    {
        let index = Arc::new(VectorIndex::open(temp.path()).unwrap());
        let f = fixture(index, ChunkingConfig::default(), 100);
        f.pipeline.ingest(text, "geometry", "g-doc").await.unwrap();
    }

    let index = Arc::new(VectorIndex::open(temp.path()).unwrap());
    let f = fixture(index, ChunkingConfig::default(), 100);
    let results = f.retriever.retrieve(text, Some("geometry"), None).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].metadata.chapter.as_deref(), Some("Chapter 3: Geometry"));
    assert!(results[0].distance.abs() < 1e-5);
}
