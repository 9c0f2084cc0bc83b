//! Domain models.

pub mod chunk;
pub mod config;
pub mod document;
pub mod ingest;
pub mod query;

pub use chunk::{
    ChildChunk, ChildWrite, ChunkEmbedding, ChunkStrategy, EmbeddingType, ParentChunk, ParentWrite,
};
pub use config::Config;
pub use document::{Document, DocumentType};
pub use ingest::{IngestReport, IngestRequest, IngestStage, ProgressCallback};
pub use query::{
    ChunkMatch, QueryAnalysis, QueryStrategy, RetrieveRequest, RetrieveResponse, RetrievedChunk,
    TransformedQuery, VectorQuery,
};
