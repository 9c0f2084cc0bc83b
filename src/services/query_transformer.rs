//! Adaptive query transformation: direct / expansion / hypothetical document.
//!
//! The transformer is an enhancement, never a gate: if any chat call fails the
//! original query text is used and the retrieval path stays available.

use std::sync::Arc;

use serde::Deserialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::query::{QueryAnalysis, QueryStrategy, TransformedQuery};
use crate::domain::ports::chat::{ChatClient, ChatMessage, ChatRequest};
use crate::services::extract_json_from_response;

/// How the caller asked for the query to be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Classify with the model, then rewrite accordingly.
    Smart,
    ForceExpansion,
    ForceHyde,
    /// No transformation.
    Passthrough,
}

impl QueryMode {
    /// Manual booleans take precedence over smart classification.
    pub fn from_flags(use_smart_query: bool, use_query_expansion: bool, use_hyde: bool) -> Self {
        if use_query_expansion {
            Self::ForceExpansion
        } else if use_hyde {
            Self::ForceHyde
        } else if use_smart_query {
            Self::Smart
        } else {
            Self::Passthrough
        }
    }
}

const QUESTION_WORDS: &[&str] = &[
    "如何", "怎么", "为什么", "什么是", "how", "what", "why", "when", "where",
];

pub struct QueryTransformer {
    chat: Arc<dyn ChatClient>,
}

impl QueryTransformer {
    pub fn new(chat: Arc<dyn ChatClient>) -> Self {
        Self { chat }
    }

    /// Produce the effective query used for embedding.
    pub async fn transform(&self, query: &str, mode: QueryMode) -> TransformedQuery {
        match mode {
            QueryMode::Passthrough => TransformedQuery::passthrough(query),
            QueryMode::ForceExpansion => {
                self.apply(query, QueryStrategy::Expansion, "requested by caller")
                    .await
            }
            QueryMode::ForceHyde => {
                self.apply(query, QueryStrategy::Hyde, "requested by caller")
                    .await
            }
            QueryMode::Smart => {
                let analysis = self.classify(query).await;
                self.apply(query, analysis.strategy, &analysis.reason).await
            }
        }
    }

    /// Classify with the model; a malformed response falls back to rules.
    async fn classify(&self, query: &str) -> QueryAnalysis {
        match self.classify_with_model(query).await {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::debug!(error = %e, "classifier unavailable, using rule-based fallback");
                classify_by_rules(query)
            }
        }
    }

    async fn classify_with_model(&self, query: &str) -> DomainResult<QueryAnalysis> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(
                "You route search queries for a documentation retrieval system. \
                 Pick one strategy:\n\
                 - \"direct\": the query already contains precise identifiers \
                 (CamelCase, snake_case, dotted calls, backticks, exact API names).\n\
                 - \"expansion\": the query is short or vocabulary-sparse and \
                 benefits from synonyms and related technical terms.\n\
                 - \"hyde\": the query is a how/why/what-is question, a \
                 troubleshooting request, or asks for a concept explanation.\n\
                 Respond with only a JSON object: \
                 {\"strategy\": \"...\", \"reason\": \"...\", \"confidence\": 0.0}",
            ),
            ChatMessage::user(query.to_string()),
        ])
        .with_max_tokens(200);

        let response = self.chat.complete(request).await?;
        let json = extract_json_from_response(&response);
        let wire: WireAnalysis = serde_json::from_str(&json)?;

        let strategy = match wire.strategy.to_lowercase().as_str() {
            "direct" => QueryStrategy::Direct,
            "expansion" => QueryStrategy::Expansion,
            "hyde" => QueryStrategy::Hyde,
            other => {
                return Err(DomainError::Serialization(format!(
                    "unknown query strategy: {other}"
                )))
            }
        };

        Ok(QueryAnalysis {
            strategy,
            reason: wire.reason,
            confidence: wire.confidence,
        })
    }

    async fn apply(&self, query: &str, strategy: QueryStrategy, reason: &str) -> TransformedQuery {
        let text = match strategy {
            QueryStrategy::Direct => query.to_string(),
            QueryStrategy::Expansion => self.expand(query).await.unwrap_or_else(|e| {
                tracing::debug!(error = %e, "query expansion failed, using original query");
                query.to_string()
            }),
            QueryStrategy::Hyde => self.hypothetical_document(query).await.unwrap_or_else(|e| {
                tracing::debug!(error = %e, "hyde generation failed, using original query");
                query.to_string()
            }),
        };

        TransformedQuery {
            text,
            strategy: Some(strategy),
            reason: Some(reason.to_string()),
        }
    }

    async fn expand(&self, query: &str) -> DomainResult<String> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(
                "Rewrite the search query to roughly 100-150 characters, adding \
                 synonyms and related technical terms while preserving its \
                 intent. Output only the rewritten query.",
            ),
            ChatMessage::user(query.to_string()),
        ])
        .with_max_tokens(150);

        let rewritten = self.chat.complete(request).await?;
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            return Err(DomainError::ChatService("empty expansion".to_string()));
        }
        Ok(rewritten.to_string())
    }

    async fn hypothetical_document(&self, query: &str) -> DomainResult<String> {
        let request = ChatRequest::new(vec![
            ChatMessage::system(
                "Write a 150-250 character excerpt of a hypothetical technical \
                 document that would answer the query, in documentation voice. \
                 Illustrative code is allowed. Output only the excerpt.",
            ),
            ChatMessage::user(query.to_string()),
        ])
        .with_max_tokens(300);

        let document = self.chat.complete(request).await?;
        let document = document.trim();
        if document.is_empty() {
            return Err(DomainError::ChatService("empty hyde document".to_string()));
        }
        Ok(document.to_string())
    }
}

/// Rule-based classification, used when the model response is malformed or
/// the endpoint is unreachable.
pub fn classify_by_rules(query: &str) -> QueryAnalysis {
    let trimmed = query.trim();
    let lowered = trimmed.to_lowercase();

    if QUESTION_WORDS.iter().any(|word| lowered.starts_with(*word)) {
        return QueryAnalysis {
            strategy: QueryStrategy::Hyde,
            reason: "question-style query".to_string(),
            confidence: 0.5,
        };
    }

    if trimmed.chars().count() < 10 || trimmed.split_whitespace().count() < 3 {
        return QueryAnalysis {
            strategy: QueryStrategy::Expansion,
            reason: "short query".to_string(),
            confidence: 0.5,
        };
    }

    if contains_code_tokens(trimmed) {
        return QueryAnalysis {
            strategy: QueryStrategy::Direct,
            reason: "contains code identifiers".to_string(),
            confidence: 0.5,
        };
    }

    QueryAnalysis {
        strategy: QueryStrategy::Expansion,
        reason: "plain prose query".to_string(),
        confidence: 0.5,
    }
}

/// CamelCase, snake_case, dotted calls, or backticks.
fn contains_code_tokens(query: &str) -> bool {
    if query.contains('`') {
        return true;
    }

    for token in query.split_whitespace() {
        let token = token.trim_matches(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'));

        if token.contains('_')
            && token
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_')
            && token.chars().any(char::is_alphanumeric)
        {
            return true;
        }

        let dotted_parts = token
            .split('.')
            .filter(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_')
            })
            .count();
        if token.contains('.') && dotted_parts >= 2 {
            return true;
        }

        let chars: Vec<char> = token.chars().collect();
        if chars
            .windows(2)
            .any(|pair| pair[0].is_lowercase() && pair[1].is_uppercase())
        {
            return true;
        }
    }

    false
}

#[derive(Debug, Deserialize)]
struct WireAnalysis {
    strategy: String,
    #[serde(default)]
    reason: String,
    #[serde(default = "default_confidence")]
    confidence: f32,
}

fn default_confidence() -> f32 {
    0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

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

    #[test]
    fn test_rules_question_words_pick_hyde() {
        assert_eq!(
            classify_by_rules("how do I configure the database?").strategy,
            QueryStrategy::Hyde
        );
        assert_eq!(
            classify_by_rules("如何配置数据库连接?").strategy,
            QueryStrategy::Hyde
        );
        assert_eq!(
            classify_by_rules("Why does startup fail sometimes").strategy,
            QueryStrategy::Hyde
        );
    }

    #[test]
    fn test_rules_short_query_picks_expansion() {
        assert_eq!(classify_by_rules("caching").strategy, QueryStrategy::Expansion);
        assert_eq!(
            classify_by_rules("session store").strategy,
            QueryStrategy::Expansion
        );
    }

    #[test]
    fn test_rules_code_tokens_pick_direct() {
        assert_eq!(
            classify_by_rules("error handling in getUserById please").strategy,
            QueryStrategy::Direct
        );
        assert_eq!(
            classify_by_rules("calls to parse_config in the loader module").strategy,
            QueryStrategy::Direct
        );
        assert_eq!(
            classify_by_rules("usage of client.fetch_all across repos").strategy,
            QueryStrategy::Direct
        );
        assert_eq!(
            classify_by_rules("docs mentioning `ensure_strategy` behavior").strategy,
            QueryStrategy::Direct
        );
    }

    #[test]
    fn test_rules_prose_defaults_to_expansion() {
        assert_eq!(
            classify_by_rules("documents about the deployment pipeline internals").strategy,
            QueryStrategy::Expansion
        );
    }

    #[tokio::test]
    async fn test_smart_mode_uses_model_classification() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(
            r#"{"strategy": "direct", "reason": "has identifier", "confidence": 0.9}"#.to_string(),
        )]));
        let transformer = QueryTransformer::new(chat);

        let result = transformer.transform("getUserById", QueryMode::Smart).await;

        assert_eq!(result.strategy, Some(QueryStrategy::Direct));
        assert_eq!(result.text, "getUserById");
        assert_eq!(result.reason.as_deref(), Some("has identifier"));
    }

    #[tokio::test]
    async fn test_malformed_classifier_json_falls_back_to_rules() {
        let chat = Arc::new(ScriptedChat::new(vec![
            Ok("definitely not json".to_string()),
            // No second response: the expansion rewrite fails and the
            // original text is kept.
        ]));
        let transformer = QueryTransformer::new(chat);

        let result = transformer.transform("caching", QueryMode::Smart).await;

        assert_eq!(result.strategy, Some(QueryStrategy::Expansion));
        assert_eq!(result.text, "caching");
    }

    #[tokio::test]
    async fn test_chat_failure_keeps_original_query() {
        let chat = Arc::new(ScriptedChat::new(vec![]));
        let transformer = QueryTransformer::new(chat);

        let result = transformer
            .transform("how does retry work?", QueryMode::Smart)
            .await;

        // Classifier failed -> rules pick hyde; hyde generation failed ->
        // original text survives.
        assert_eq!(result.strategy, Some(QueryStrategy::Hyde));
        assert_eq!(result.text, "how does retry work?");
    }

    #[tokio::test]
    async fn test_forced_expansion_rewrites() {
        let chat = Arc::new(ScriptedChat::new(vec![Ok(
            "caching strategies, cache invalidation, TTL eviction, memoization in services"
                .to_string(),
        )]));
        let transformer = QueryTransformer::new(chat);

        let result = transformer
            .transform("caching", QueryMode::ForceExpansion)
            .await;

        assert_eq!(result.strategy, Some(QueryStrategy::Expansion));
        assert!(result.text.contains("cache invalidation"));
    }

    #[tokio::test]
    async fn test_passthrough_leaves_query_untouched() {
        let chat = Arc::new(ScriptedChat::new(vec![]));
        let transformer = QueryTransformer::new(chat);

        let result = transformer
            .transform("plain query", QueryMode::Passthrough)
            .await;

        assert_eq!(result.text, "plain query");
        assert!(result.strategy.is_none());
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_mode_precedence() {
        assert_eq!(QueryMode::from_flags(true, false, false), QueryMode::Smart);
        assert_eq!(
            QueryMode::from_flags(true, true, false),
            QueryMode::ForceExpansion
        );
        assert_eq!(QueryMode::from_flags(true, false, true), QueryMode::ForceHyde);
        assert_eq!(
            QueryMode::from_flags(false, false, false),
            QueryMode::Passthrough
        );
    }
}
