//! Textbook documents: structure-aware chunking and ingestion.
//!
//! This module provides:
//! - Chapter/section aware chunking with size-bounded splitting
//! - Chunk metadata as stored alongside each vector
//! - The ingestion pipeline (chunk, embed, index) and its delete operations

pub mod chunker;
pub mod config;
pub mod pipeline;
pub mod types;

pub use chunker::{Chunker, SPLIT_KEY, SplitStrategy, StructuredChunker};
pub use config::ChunkingConfig;
pub use pipeline::IngestionPipeline;
pub use types::{Chunk, ChunkMetadata, DocumentStatus};
