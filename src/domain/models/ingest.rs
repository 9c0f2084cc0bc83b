//! Ingest request/report models and progress reporting.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::chunk::ChunkStrategy;
use crate::domain::models::document::DocumentType;

/// Ingest request body. `doc_type` is free-form and normalized at the edge.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub project_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// What an ingest produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub document_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub project_name: String,
    pub parent_chunks_created: usize,
    pub child_chunks_created: usize,
    pub embeddings_created: usize,
    pub strategies: Vec<ChunkStrategy>,
}

/// Pipeline phase reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Chunking,
    Summarizing,
    Embedding,
    Writing,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunking => "chunking",
            Self::Summarizing => "summarizing",
            Self::Embedding => "embedding",
            Self::Writing => "writing",
        }
    }
}

/// Synchronous progress callback invoked at phase boundaries with
/// `(stage, current, total)`. Must not block on I/O.
pub type ProgressCallback = Arc<dyn Fn(IngestStage, usize, usize) + Send + Sync>;
