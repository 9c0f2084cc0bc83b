//! Chat-completion port.
//!
//! Abstracts the remote OpenAI-compatible `/chat/completions` endpoint so
//! services can be exercised against scripted clients in tests.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// A single message in a completion request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            max_tokens: 1024,
            temperature: 0.3,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the assistant message content for a completion request.
    async fn complete(&self, request: ChatRequest) -> DomainResult<String>;
}
