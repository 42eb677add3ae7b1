//! Core types for document chunking and indexing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A chunk of a document with its structural labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content of this chunk.
    pub content: String,

    /// Ordinal within the document, in emission order.
    pub index: usize,

    /// Chapter label (e.g. "Chapter 1: Intro").
    pub chapter: Option<String>,

    /// Section label (e.g. "Section 1.1: Basics").
    pub section: Option<String>,

    /// Free-form key/value annotations.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// Create an unlabeled chunk.
    pub fn new(content: String, index: usize) -> Self {
        Self {
            content,
            index,
            chapter: None,
            section: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Attach chapter and section labels.
    pub fn with_labels(mut self, chapter: Option<String>, section: Option<String>) -> Self {
        self.chapter = chapter;
        self.section = section;
        self
    }

    /// Get a preview of the content (first N characters).
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }

    /// Get the length of the content in characters.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Metadata stored next to every indexed chunk vector.
///
/// `chapter` and `section` are written as empty strings when absent and read
/// back as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub module_id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub chapter: Option<String>,
    pub section: Option<String>,
    /// Extension map carried over from [`Chunk::metadata`].
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ChunkMetadata {
    /// Build index metadata for a chunk owned by `document_id` in `module_id`.
    pub fn for_chunk(chunk: &Chunk, module_id: &str, document_id: &str) -> Self {
        Self {
            module_id: module_id.to_string(),
            document_id: document_id.to_string(),
            chunk_index: chunk.index,
            chapter: chunk.chapter.clone(),
            section: chunk.section.clone(),
            extra: chunk.metadata.clone(),
        }
    }

    /// Index entry id for a chunk: `{document_id}_chunk_{index}`.
    pub fn entry_id(document_id: &str, index: usize) -> String {
        format!("{document_id}_chunk_{index}")
    }
}

/// Processing state of an uploaded document, as tracked by the metadata store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Processed,
    Error,
}

impl DocumentStatus {
    /// Status a document should move to once an ingestion attempt settles.
    pub fn after_ingest<T, E>(result: &Result<T, E>) -> Self {
        match result {
            Ok(_) => Self::Processed,
            Err(_) => Self::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(Self::Uploaded),
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown document status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_preview() {
        let chunk = Chunk::new("Hello, world! This is a test.".to_string(), 0);

        assert_eq!(chunk.preview(5), "Hello");
        assert_eq!(chunk.preview(100), "Hello, world! This is a test.");
    }

    #[test]
    fn test_chunk_preview_multibyte() {
        let chunk = Chunk::new("½ + ¼ = ¾".to_string(), 0);
        assert_eq!(chunk.preview(1), "½");
        assert_eq!(chunk.char_count(), 9);
    }

    #[test]
    fn test_entry_id_format() {
        assert_eq!(ChunkMetadata::entry_id("doc-7", 3), "doc-7_chunk_3");
    }

    #[test]
    fn test_metadata_for_chunk() {
        let chunk = Chunk::new("x".to_string(), 4)
            .with_labels(Some("Chapter 2".to_string()), None);
        let meta = ChunkMetadata::for_chunk(&chunk, "algebra", "doc-1");

        assert_eq!(meta.module_id, "algebra");
        assert_eq!(meta.document_id, "doc-1");
        assert_eq!(meta.chunk_index, 4);
        assert_eq!(meta.chapter.as_deref(), Some("Chapter 2"));
        assert!(meta.section.is_none());
    }

    #[test]
    fn test_status_after_ingest() {
        let ok: Result<usize, String> = Ok(3);
        let failed: Result<usize, String> = Err("boom".to_string());

        assert_eq!(DocumentStatus::after_ingest(&ok), DocumentStatus::Processed);
        assert_eq!(DocumentStatus::after_ingest(&failed), DocumentStatus::Error);
        assert_eq!("processing".parse::<DocumentStatus>(), Ok(DocumentStatus::Processing));
        assert!("archived".parse::<DocumentStatus>().is_err());
    }
}
