//! LLM re-ranking: fuse vector similarity with model-scored relevance.
//!
//! Re-ranking is an enhancement; any parse or transport error degrades to the
//! vector-only order truncated to `top_k`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::query::RetrievedChunk;
use crate::domain::ports::chat::{ChatClient, ChatMessage, ChatRequest};
use crate::services::extract_json_from_response;

const VECTOR_WEIGHT: f32 = 0.3;
const SCORE_WEIGHT: f32 = 0.7;
const SUMMARY_LIMIT: usize = 500;
const CONTENT_LIMIT: usize = 200;
const DEFAULT_SCORE: f32 = 5.0;

pub struct Reranker {
    chat: Arc<dyn ChatClient>,
}

impl Reranker {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    /// Score candidates against the original query and reorder by the fused
    /// score `0.3 * vector_similarity + 0.7 * (score / 10)`, replacing each
    /// candidate's `similarity` with the fused value.
    pub async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<RetrievedChunk>,
        top_k: usize,
    ) -> Vec<RetrievedChunk> {
        if candidates.len() <= 1 {
            candidates.truncate(top_k);
            return candidates;
        }

        match self.score_candidates(query, &candidates).await {
            Ok(scores) => {
                for (index, candidate) in candidates.iter_mut().enumerate() {
                    let score = scores.get(&index).copied().unwrap_or(DEFAULT_SCORE);
                    candidate.similarity =
                        VECTOR_WEIGHT * candidate.similarity + SCORE_WEIGHT * (score / 10.0);
                }
                candidates.sort_by(|a, b| {
                    b.similarity
                        .partial_cmp(&a.similarity)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                candidates.truncate(top_k);
                candidates
            }
            Err(e) => {
                tracing::warn!(error = %e, "rerank failed, keeping vector order");
                candidates.truncate(top_k);
                candidates
            }
        }
    }

    async fn score_candidates(
        &self,
        query: &str,
        candidates: &[RetrievedChunk],
    ) -> DomainResult<HashMap<usize, f32>> {
        let mut listing = String::new();
        for (index, candidate) in candidates.iter().enumerate() {
            let summary = truncate_chars(&candidate.parent_chunk_summary, SUMMARY_LIMIT);
            let content = truncate_chars(&candidate.child_chunk_content, CONTENT_LIMIT);
            listing.push_str(&format!("[doc {index}] {summary}\n{content}\n\n"));
        }

        let request = ChatRequest::new(vec![
            ChatMessage::system(
                "Score each candidate document 0-10 for relevance to the query. \
                 Respond with only a JSON array like \
                 [{\"id\": 0, \"score\": 7}, ...] covering every candidate.",
            ),
            ChatMessage::user(format!("Query: {query}\n\nCandidates:\n{listing}")),
        ])
        .with_max_tokens(500);

        let response = self.chat.complete(request).await?;
        let json = extract_json_from_response(&response);
        let entries: Vec<ScoreEntry> = serde_json::from_str(&json)?;

        Ok(entries
            .into_iter()
            .map(|entry| (entry.id, entry.score.clamp(0.0, 10.0)))
            .collect())
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit).collect()
}

#[derive(Debug, Deserialize)]
struct ScoreEntry {
    id: usize,
    score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::document::DocumentType;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    struct ScriptedChat {
        responses: Mutex<Vec<DomainResult<String>>>,
    }

    impl ScriptedChat {
        fn new(responses: Vec<DomainResult<String>>) -> Self {
            Self {
                responses: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn complete(&self, _request: ChatRequest) -> DomainResult<String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(DomainError::ChatService("no scripted response".to_string()));
            }
            responses.remove(0)
        }
    }

    fn candidate(index: usize, similarity: f32) -> RetrievedChunk {
        RetrievedChunk {
            document_id: Uuid::new_v4(),
            document_title: None,
            project_name: "p".to_string(),
            document_type: DocumentType::GeneralDoc,
            parent_chunk_content: format!("parent {index}"),
            parent_chunk_summary: format!("summary {index}"),
            child_chunk_content: format!("child {index}"),
            similarity,
        }
    }

    #[tokio::test]
    async fn test_fusion_reorders_by_combined_score() {
        // Nine candidates; the model scores four of them 9, the rest 0.
        let scores = "[{\"id\":0,\"score\":9},{\"id\":1,\"score\":9},{\"id\":2,\"score\":0},\
                      {\"id\":3,\"score\":9},{\"id\":4,\"score\":0},{\"id\":5,\"score\":0},\
                      {\"id\":6,\"score\":9},{\"id\":7,\"score\":0},{\"id\":8,\"score\":0}]";
        let chat = Arc::new(ScriptedChat::new(vec![Ok(scores.to_string())]));
        let reranker = Reranker::new(chat);

        let candidates: Vec<RetrievedChunk> = (0..9)
            .map(|i| candidate(i, 0.9 - 0.05 * i as f32))
            .collect();
        let expected_similarities: Vec<f32> = [0, 1, 3]
            .iter()
            .map(|&i| 0.3 * (0.9 - 0.05 * i as f32) + 0.7 * 0.9)
            .collect();

        let results = reranker.rerank("query", candidates, 3).await;

        assert_eq!(results.len(), 3);
        // The three best 9-scored candidates, ordered by fused score.
        assert_eq!(results[0].child_chunk_content, "child 0");
        assert_eq!(results[1].child_chunk_content, "child 1");
        assert_eq!(results[2].child_chunk_content, "child 3");
        for (result, expected) in results.iter().zip(expected_similarities) {
            assert!((result.similarity - expected).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_missing_id_defaults_to_five() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(
            "[{\"id\":1,\"score\":10}]".to_string()
        )]));
        let reranker = Reranker::new(chat);

        let candidates = vec![candidate(0, 0.8), candidate(1, 0.4)];
        let results = reranker.rerank("query", candidates, 2).await;

        // Candidate 1: 0.3*0.4 + 0.7*1.0 = 0.82; candidate 0: 0.3*0.8 + 0.7*0.5 = 0.59.
        assert_eq!(results[0].child_chunk_content, "child 1");
        assert!((results[0].similarity - 0.82).abs() < 1e-6);
        assert!((results[1].similarity - 0.59).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_parse_failure_degrades_to_vector_order() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok("no json here".to_string())]));
        let reranker = Reranker::new(chat);

        let candidates: Vec<RetrievedChunk> =
            (0..5).map(|i| candidate(i, 1.0 - 0.1 * i as f32)).collect();
        let results = reranker.rerank("query", candidates, 3).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].child_chunk_content, "child 0");
        assert_eq!(results[1].child_chunk_content, "child 1");
        assert_eq!(results[2].child_chunk_content, "child 2");
        // Similarities untouched on fallback.
        assert!((results[0].similarity - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_vector_order() {
        let chat = Arc::new(ScriptedChat::new(vec![Err(DomainError::ChatService(
            "500".to_string(),
        ))]));
        let reranker = Reranker::new(chat);

        let candidates: Vec<RetrievedChunk> =
            (0..4).map(|i| candidate(i, 0.9 - 0.1 * i as f32)).collect();
        let results = reranker.rerank("query", candidates, 2).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].child_chunk_content, "child 0");
    }

    #[tokio::test]
    async fn test_fenced_scores_accepted() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(
            "```json\n[{\"id\":0,\"score\":2},{\"id\":1,\"score\":8}]\n```".to_string(),
        )]));
        let reranker = Reranker::new(chat);

        let candidates = vec![candidate(0, 0.9), candidate(1, 0.5)];
        let results = reranker.rerank("query", candidates, 2).await;

        assert_eq!(results[0].child_chunk_content, "child 1");
    }
}
