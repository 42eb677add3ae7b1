//! Error types shared across the ingestion, retrieval and validation paths.

use tantivy::TantivyError;
use tantivy::directory::error::OpenDirectoryError;
use thiserror::Error;

/// Failure talking to an embedding or generation backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request to {model} timed out after {seconds}s")]
    Timeout { model: String, seconds: u64 },

    #[error("Provider returned {actual} results for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Malformed provider response: {0}")]
    Malformed(String),

    #[error("Embedding backend error: {0}")]
    Backend(String),

    #[error("Missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    #[error("Unknown provider or model: {0}")]
    Unsupported(String),
}

/// Failure in the backing vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] TantivyError),

    #[error("Directory error: {0}")]
    Directory(#[from] OpenDirectoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(
        "Input lengths differ: {ids} ids, {texts} texts, {vectors} vectors, {metadatas} metadatas"
    )]
    LengthMismatch {
        ids: usize,
        texts: usize,
        vectors: usize,
        metadatas: usize,
    },

    #[error("Vector dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Error surfaced by ingestion and retrieval.
///
/// Both variants pass through unchanged so the orchestration layer can decide
/// how to report them (mark the document errored, fail the chat request, ...).
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A validation run that could not be attempted at all.
///
/// Individual judge failures never surface here; they become `error` votes.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("No validator models configured")]
    NoValidators,
}

pub type IndexResult<T> = Result<T, IndexError>;
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_bubbles_through_pipeline() {
        let err: PipelineError = ProviderError::CountMismatch {
            expected: 3,
            actual: 2,
        }
        .into();
        assert!(matches!(err, PipelineError::Provider(_)));
        assert_eq!(err.to_string(), "Provider returned 2 results for 3 inputs");
    }

    #[test]
    fn test_length_mismatch_message() {
        let err = IndexError::LengthMismatch {
            ids: 2,
            texts: 2,
            vectors: 1,
            metadatas: 2,
        };
        assert!(err.to_string().contains("1 vectors"));
    }
}
