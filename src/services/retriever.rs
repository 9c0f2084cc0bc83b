//! Two-stage retrieval: vector nearest-neighbor then LLM re-ranking.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::query::{
    ChunkMatch, RetrieveRequest, RetrieveResponse, VectorQuery,
};
use crate::domain::ports::repository::ChunkRepository;
use crate::services::embedder::Embedder;
use crate::services::query_transformer::{QueryMode, QueryTransformer};
use crate::services::reranker::Reranker;

/// Over-fetch factor when a re-rank pass follows the vector search.
const RERANK_FETCH_FACTOR: usize = 3;

pub struct Retriever {
    embedder: Arc<Embedder>,
    chunks: Arc<dyn ChunkRepository>,
    transformer: Arc<QueryTransformer>,
    reranker: Arc<Reranker>,
}

impl Retriever {
    pub fn new(
        embedder: Arc<Embedder>,
        chunks: Arc<dyn ChunkRepository>,
        transformer: Arc<QueryTransformer>,
        reranker: Arc<Reranker>,
    ) -> Self {
        Self {
            embedder,
            chunks,
            transformer,
            reranker,
        }
    }

    pub async fn retrieve(&self, request: RetrieveRequest) -> DomainResult<RetrieveResponse> {
        if request.query.trim().is_empty() {
            return Err(DomainError::Validation("query must not be empty".to_string()));
        }
        if request.top_k == 0 {
            return Err(DomainError::Validation("top_k must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&request.similarity_threshold) {
            return Err(DomainError::Validation(
                "similarity_threshold must be within [0, 1]".to_string(),
            ));
        }

        let mode = QueryMode::from_flags(
            request.use_smart_query,
            request.use_query_expansion,
            request.use_hyde,
        );
        let transformed = self.transformer.transform(&request.query, mode).await;

        tracing::debug!(
            strategy = ?transformed.strategy,
            effective_chars = transformed.text.chars().count(),
            "transformed query"
        );

        // The effective query is embedded without contextual enrichment.
        let vector = self.embedder.embed(&transformed.text).await?;
        if vector.is_empty() {
            return Err(DomainError::EmbeddingFailed(
                "query produced an empty embedding".to_string(),
            ));
        }

        let fetch_limit = if request.use_rerank {
            request.top_k * RERANK_FETCH_FACTOR
        } else {
            request.top_k
        };

        let matches = self
            .chunks
            .search_children(&VectorQuery {
                embedding: vector,
                limit: fetch_limit,
                min_similarity: request.similarity_threshold,
                project_name: request.project_name.clone(),
            })
            .await?;

        let mut results: Vec<_> = matches.into_iter().map(ChunkMatch::into_retrieved).collect();

        if request.use_rerank && results.len() > 1 {
            // Re-ranking sees the original query, not the transformed one.
            results = self
                .reranker
                .rerank(&request.query, results, request.top_k)
                .await;
        } else {
            results.truncate(request.top_k);
        }

        Ok(RetrieveResponse {
            query: request.query,
            project_name: request.project_name,
            total_results: results.len(),
            results,
            query_strategy: transformed.strategy,
            strategy_reason: transformed.reason,
        })
    }
}
