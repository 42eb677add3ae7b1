//! Module-scoped retrieval and grounding-context assembly.

pub mod prompt;
mod retriever;

pub use retriever::{DEFAULT_TOP_K, Retriever};

use serde::Serialize;

use crate::documents::ChunkMetadata;

/// One retrieved chunk. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query; 0 means same direction.
    pub distance: f32,
}

/// Which module a query is about, and how to describe it to the tutor.
///
/// `module_id` filters the index. `name` switches the context into the
/// scope-restricted template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleScope {
    pub module_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl ModuleScope {
    /// No module: search everything, unscoped template.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn module(module_id: impl Into<String>) -> Self {
        Self {
            module_id: Some(module_id.into()),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Module name, if set and non-blank.
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }

    pub fn description(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}
