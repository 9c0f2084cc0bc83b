//! Parent-span summarization via the chat endpoint.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::document::DocumentType;
use crate::domain::ports::chat::{ChatClient, ChatMessage, ChatRequest};

const FALLBACK_CHARS: usize = 200;

/// Generates concise summaries for parent spans, with a prompt variant per
/// document type.
pub struct Summarizer {
    chat: Arc<dyn ChatClient>,
    max_tokens: u32,
    concurrency: usize,
}

impl Summarizer {
    pub fn new(chat: Arc<dyn ChatClient>, max_tokens: u32, concurrency: usize) -> Self {
        Self {
            chat,
            max_tokens,
            concurrency: concurrency.max(1),
        }
    }

    /// Summarize one span. Blank input returns an empty string without a
    /// model call; an empty model response falls back to a truncation of the
    /// source. Transport failures block ingestion for the affected span.
    pub async fn summarize(&self, content: &str, doc_type: DocumentType) -> DomainResult<String> {
        if content.trim().is_empty() {
            return Ok(String::new());
        }

        let request = ChatRequest::new(vec![
            ChatMessage::system(type_instructions(doc_type)),
            ChatMessage::user(format!(
                "Summarize the following excerpt so a developer searching the corpus \
                 would find it. Keep it concise.\n\n{content}"
            )),
        ])
        .with_max_tokens(self.max_tokens);

        let summary = self
            .chat
            .complete(request)
            .await
            .map_err(|e| DomainError::SummaryFailed(e.to_string()))?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Ok(truncation_fallback(content));
        }
        Ok(summary.to_string())
    }

    /// Summarize many spans with bounded fan-out, preserving input order.
    pub async fn summarize_batch(
        &self,
        inputs: &[(String, DocumentType)],
    ) -> DomainResult<Vec<String>> {
        let futures: Vec<Pin<Box<dyn Future<Output = DomainResult<String>> + Send + '_>>> =
            inputs
                .iter()
                .map(|(content, doc_type)| {
                    let fut: Pin<Box<dyn Future<Output = DomainResult<String>> + Send + '_>> =
                        Box::pin(self.summarize(content, *doc_type));
                    fut
                })
                .collect();

        stream::iter(futures)
            .buffered(self.concurrency)
            .try_collect()
            .await
    }
}

fn type_instructions(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::ApiDoc => {
            "You summarize API documentation. Name the endpoints, parameters, \
             and return values the excerpt covers."
        }
        DocumentType::TechDoc => {
            "You summarize technical design documentation. Name the \
             architectural elements involved and how they interact."
        }
        DocumentType::CodeLogicDoc => {
            "You summarize code behavior documentation. Name the functions \
             involved and describe the control flow."
        }
        DocumentType::GeneralDoc => {
            "You summarize documentation. Capture the main topics and the \
             terminology a reader would search for."
        }
    }
}

fn truncation_fallback(content: &str) -> String {
    let truncated: String = content.chars().take(FALLBACK_CHARS).collect();
    format!("{truncated}...")
}
