//! Persistence ports for documents and the chunk hierarchy.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::chunk::{ChunkStrategy, ParentWrite};
use crate::domain::models::document::Document;
use crate::domain::models::query::{ChunkMatch, VectorQuery};

/// Per-document chunk/embedding row counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentStats {
    pub parent_chunks: usize,
    pub child_chunks: usize,
    pub embeddings: usize,
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn insert(&self, document: &Document) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>>;

    /// Delete a document; the store cascades to all owned spans and
    /// embeddings. Fails with `DocumentNotFound` if the row is absent.
    async fn delete(&self, id: Uuid) -> DomainResult<()>;
}

#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Find-or-create a strategy row by its unique triple and return its id.
    /// Races resolve through the unique constraint: on a duplicate-key
    /// collision the writer retries the find.
    async fn ensure_strategy(&self, strategy: &ChunkStrategy) -> DomainResult<i64>;

    /// Write parents, children, and embeddings in document order inside one
    /// transaction.
    async fn insert_tree(&self, parents: &[ParentWrite]) -> DomainResult<()>;

    /// Cosine nearest-neighbor search over child-span content embeddings,
    /// joined to parent and document rows.
    async fn search_children(&self, query: &VectorQuery) -> DomainResult<Vec<ChunkMatch>>;

    async fn document_stats(&self, document_id: Uuid) -> DomainResult<DocumentStats>;
}
