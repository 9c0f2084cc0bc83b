//! Chunk hierarchy models: strategies, parent/child spans, and embeddings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

/// A chunking configuration. The triple
/// (parent_chunk_size, child_chunk_size, overlap_percent) is globally unique
/// in the store; rows are created lazily on first use and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkStrategy {
    pub parent_chunk_size: usize,
    pub child_chunk_size: usize,
    pub overlap_percent: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        Self {
            parent_chunk_size: 2000,
            child_chunk_size: 800,
            overlap_percent: 25,
            name: None,
        }
    }
}

impl ChunkStrategy {
    pub fn validate(&self) -> DomainResult<()> {
        if self.parent_chunk_size == 0 || self.child_chunk_size == 0 {
            return Err(DomainError::Validation(
                "chunk sizes must be positive".to_string(),
            ));
        }
        if self.child_chunk_size > self.parent_chunk_size {
            return Err(DomainError::Validation(format!(
                "child_chunk_size {} exceeds parent_chunk_size {}",
                self.child_chunk_size, self.parent_chunk_size
            )));
        }
        if self.overlap_percent >= 100 {
            return Err(DomainError::Validation(format!(
                "overlap_percent {} must be below 100",
                self.overlap_percent
            )));
        }
        Ok(())
    }

    /// Character overlap between adjacent parent spans.
    pub fn parent_overlap(&self) -> usize {
        self.parent_chunk_size * self.overlap_percent as usize / 100
    }

    /// Character overlap between adjacent child spans.
    pub fn child_overlap(&self) -> usize {
        self.child_chunk_size * self.overlap_percent as usize / 100
    }
}

/// A parent span: the retrieval context around one or more child spans.
/// Positions are half-open character offsets into the source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentChunk {
    pub id: Uuid,
    pub document_id: Uuid,
    pub strategy_id: i64,
    pub parent_index: usize,
    pub content: String,
    pub summary: String,
    pub start_position: usize,
    pub end_position: usize,
}

/// A child span: the retrieval unit. Positions are offsets into the source
/// document, not the parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildChunk {
    pub id: Uuid,
    pub parent_chunk_id: Uuid,
    pub chunk_index: usize,
    pub content: String,
    pub start_position: usize,
    pub end_position: usize,
}

/// What a stored vector encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingType {
    Content,
    Summary,
}

impl EmbeddingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Summary => "summary",
        }
    }
}

/// A dense vector for one child span. Exactly one row exists per
/// (child_chunk_id, embedding_type, model).
#[derive(Debug, Clone)]
pub struct ChunkEmbedding {
    pub id: Uuid,
    pub child_chunk_id: Uuid,
    pub embedding: Vec<f32>,
    pub embedding_type: EmbeddingType,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl ChunkEmbedding {
    pub fn content(child_chunk_id: Uuid, embedding: Vec<f32>, model: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            child_chunk_id,
            embedding,
            embedding_type: EmbeddingType::Content,
            model,
            created_at: Utc::now(),
        }
    }
}

/// One child span plus its optional embedding, staged for a tree write.
#[derive(Debug, Clone)]
pub struct ChildWrite {
    pub child: ChildChunk,
    pub embedding: Option<ChunkEmbedding>,
}

/// One parent span plus its children, staged for a tree write.
#[derive(Debug, Clone)]
pub struct ParentWrite {
    pub parent: ParentChunk,
    pub children: Vec<ChildWrite>,
}
