pub mod cli;
pub mod config;
pub mod documents;
pub mod embedding;
pub mod error;
pub mod index;
pub mod llm;
pub mod logging;
pub mod retrieval;
pub mod tutor;
pub mod validation;

pub use config::Settings;
pub use documents::{Chunk, ChunkMetadata, Chunker, DocumentStatus, IngestionPipeline, StructuredChunker};
pub use embedding::{EmbeddingProvider, EmbeddingService};
pub use error::{IndexError, PipelineError, ProviderError, ValidationError};
pub use index::{IndexHit, VectorIndex};
pub use llm::{ChatMessage, ChatProvider, ChatRequest};
pub use retrieval::{ModuleScope, RetrievalResult, Retriever};
pub use tutor::{Tutor, TutorReply};
pub use validation::{AnswerGate, ResponseValidator, Verdict, Vote, VoteResult};
