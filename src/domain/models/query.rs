//! Query-side models: transformation strategies, retrieval requests and results.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::document::DocumentType;

/// How a user query is reshaped before embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStrategy {
    /// Use the query verbatim; it already carries precise identifiers.
    Direct,
    /// Rewrite with synonyms and related technical terms.
    Expansion,
    /// Embed a hypothetical document that would answer the query.
    Hyde,
}

impl QueryStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Expansion => "expansion",
            Self::Hyde => "hyde",
        }
    }
}

/// Classifier output: the chosen strategy plus its rationale.
#[derive(Debug, Clone)]
pub struct QueryAnalysis {
    pub strategy: QueryStrategy,
    pub reason: String,
    pub confidence: f32,
}

/// The effective query produced by the transformer.
#[derive(Debug, Clone)]
pub struct TransformedQuery {
    pub text: String,
    pub strategy: Option<QueryStrategy>,
    pub reason: Option<String>,
}

impl TransformedQuery {
    pub fn passthrough(query: &str) -> Self {
        Self {
            text: query.to_string(),
            strategy: None,
            reason: None,
        }
    }
}

fn default_top_k() -> usize {
    10
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

/// Retrieval request body.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_true")]
    pub use_smart_query: bool,
    #[serde(default)]
    pub use_query_expansion: bool,
    #[serde(default)]
    pub use_hyde: bool,
    #[serde(default = "default_true")]
    pub use_rerank: bool,
}

impl RetrieveRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project_name: None,
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            use_smart_query: true,
            use_query_expansion: false,
            use_hyde: false,
            use_rerank: true,
        }
    }
}

/// A candidate row from the vector index, before score fusion. The child span
/// matched; the parent supplies surrounding context at read time.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub document_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    pub project_name: String,
    pub document_type: DocumentType,
    pub parent_chunk_content: String,
    pub parent_chunk_summary: String,
    pub child_chunk_content: String,
    pub similarity: f32,
}

/// Retrieval response body.
#[derive(Debug, Clone, Serialize)]
pub struct RetrieveResponse {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    pub total_results: usize,
    pub results: Vec<RetrievedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_strategy: Option<QueryStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_reason: Option<String>,
}

/// Nearest-neighbor query against the child-span vector index.
#[derive(Debug, Clone)]
pub struct VectorQuery {
    pub embedding: Vec<f32>,
    pub limit: usize,
    pub min_similarity: f32,
    pub project_name: Option<String>,
}

/// A raw index hit with its cosine distance.
#[derive(Debug, Clone)]
pub struct ChunkMatch {
    pub document_id: Uuid,
    pub document_title: Option<String>,
    pub project_name: String,
    pub document_type: DocumentType,
    pub parent_chunk_content: String,
    pub parent_chunk_summary: String,
    pub child_chunk_content: String,
    pub distance: f32,
}

impl ChunkMatch {
    /// Similarity reported to callers is `1 - cosine distance`.
    pub fn into_retrieved(self) -> RetrievedChunk {
        RetrievedChunk {
            document_id: self.document_id,
            document_title: self.document_title,
            project_name: self.project_name,
            document_type: self.document_type,
            parent_chunk_content: self.parent_chunk_content,
            parent_chunk_summary: self.parent_chunk_summary,
            child_chunk_content: self.child_chunk_content,
            similarity: 1.0 - self.distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: RetrieveRequest =
            serde_json::from_str(r#"{"query": "how do sessions work?"}"#).unwrap();
        assert_eq!(request.top_k, 10);
        assert!((request.similarity_threshold - 0.3).abs() < f32::EPSILON);
        assert!(request.use_smart_query);
        assert!(request.use_rerank);
        assert!(!request.use_query_expansion);
        assert!(!request.use_hyde);
    }

    #[test]
    fn test_strategy_serialized_lowercase() {
        assert_eq!(
            serde_json::to_string(&QueryStrategy::Hyde).unwrap(),
            "\"hyde\""
        );
    }
}
