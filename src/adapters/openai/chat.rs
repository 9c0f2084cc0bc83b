//! OpenAI-compatible chat-completions adapter.
//!
//! Speaks `POST {base_url}/chat/completions` and works against any
//! OpenAI-compatible server (OpenAI, Azure, local inference gateways).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::openai::retry::{RequestFailure, RetryPolicy};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::ChatApiConfig;
use crate::domain::ports::chat::{ChatClient, ChatRequest};

/// Chat client over an OpenAI-compatible completions endpoint.
pub struct OpenAiChatClient {
    config: ChatApiConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAiChatClient {
    pub fn new(config: ChatApiConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ChatService(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> DomainResult<String> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                DomainError::ChatService(
                    "chat API key not set; configure chat_api.api_key or OPENAI_API_KEY".to_string(),
                )
            })
    }

    async fn send_request(&self, body: &CompletionRequest<'_>) -> Result<String, RequestFailure> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let api_key = self
            .api_key()
            .map_err(|e| RequestFailure::permanent(e.to_string()))?;

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| RequestFailure::transient(format!("chat request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(RequestFailure::from_status(status, body));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| RequestFailure::permanent(format!("failed to parse chat response: {e}")))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RequestFailure::permanent("chat response had no choices".to_string()))
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    async fn complete(&self, request: ChatRequest) -> DomainResult<String> {
        let messages: Vec<WireMessage<'_>> = request
            .messages
            .iter()
            .map(|m| WireMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect();
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        self.retry
            .execute(|| self.send_request(&body))
            .await
            .map_err(|failure| DomainError::ChatService(failure.message))
    }
}

// -- Wire types --

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}
