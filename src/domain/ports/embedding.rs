//! Embedding provider port for dense vector generation.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Trait for embedding providers.
///
/// Implementations must preserve input order in `embed_batch` even when the
/// remote API returns items out of order, and should split oversized inputs
/// into multiple calls of at most `max_batch_size` texts.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier recorded alongside stored vectors.
    fn model(&self) -> &str;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>>;

    /// Maximum number of texts per single remote call.
    fn max_batch_size(&self) -> usize;
}
