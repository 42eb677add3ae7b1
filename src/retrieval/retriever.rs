use std::sync::Arc;

use super::prompt::render_context;
use super::{ModuleScope, RetrievalResult};
use crate::embedding::EmbeddingService;
use crate::error::PipelineResult;
use crate::index::VectorIndex;

pub const DEFAULT_TOP_K: usize = 5;

/// Embeds queries and pulls the nearest chunks from the index.
#[derive(Debug, Clone)]
pub struct Retriever {
    embeddings: EmbeddingService,
    index: Arc<VectorIndex>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embeddings: EmbeddingService, index: Arc<VectorIndex>) -> Self {
        Self {
            embeddings,
            index,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Nearest chunks to `query`, closest first.
    ///
    /// `k` falls back to the configured default. An empty index (or an empty
    /// module) yields an empty result without calling the embedding model.
    pub async fn retrieve(
        &self,
        query: &str,
        module_id: Option<&str>,
        k: Option<usize>,
    ) -> PipelineResult<Vec<RetrievalResult>> {
        let k = k.unwrap_or(self.top_k);
        if k == 0 || self.index.count(module_id)? == 0 {
            tracing::debug!(target: "retrieval", "nothing to search in {}", module_id.unwrap_or("*"));
            return Ok(Vec::new());
        }

        let vector = self.embeddings.embed(query).await?;
        let hits = self.index.query(&vector, module_id, k)?;

        tracing::debug!(
            target: "retrieval",
            "retrieved {} chunks (k={k}, module={})",
            hits.len(),
            module_id.unwrap_or("*")
        );

        Ok(hits
            .into_iter()
            .map(|hit| RetrievalResult {
                id: hit.id,
                content: hit.content,
                metadata: hit.metadata,
                distance: hit.distance,
            })
            .collect())
    }

    /// Retrieve for `query` within `scope` and render the grounding context.
    pub async fn build_context(
        &self,
        query: &str,
        scope: &ModuleScope,
        k: Option<usize>,
    ) -> PipelineResult<String> {
        let results = self.retrieve(query, scope.module_id(), k).await?;
        Ok(render_context(&results, scope))
    }
}
