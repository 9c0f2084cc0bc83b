//! OpenAI-compatible embeddings adapter.
//!
//! Speaks `POST {base_url}/embeddings`. Oversized inputs are split into
//! batches of at most `max_batch_size` texts, and response items are re-sorted
//! by their returned `index` so callers always see input order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::adapters::openai::retry::{RequestFailure, RetryPolicy};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::config::EmbeddingApiConfig;
use crate::domain::ports::embedding::EmbeddingProvider;

/// Embedding provider over an OpenAI-compatible embeddings endpoint.
pub struct OpenAiEmbeddingProvider {
    config: EmbeddingApiConfig,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: EmbeddingApiConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                DomainError::EmbeddingFailed(format!("failed to build HTTP client: {e}"))
            })?;
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

    fn api_key(&self) -> Result<String, RequestFailure> {
        self.config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                RequestFailure::permanent(
                    "embedding API key not set; configure embedding_api.api_key or OPENAI_API_KEY",
                )
            })
    }

    async fn send_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RequestFailure> {
        let url = format!("{}/embeddings", self.config.base_url);
        let api_key = self.api_key()?;

        let body = EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {api_key}"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| RequestFailure::transient(format!("embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(RequestFailure::from_status(status, body));
        }

        let parsed: EmbeddingsResponse = response.json().await.map_err(|e| {
            RequestFailure::permanent(format!("failed to parse embedding response: {e}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(RequestFailure::permanent(format!(
                "embedding response carried {} items for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        // The API may return items out of order; the index field is authoritative.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    async fn call_batched(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.max_batch_size.max(1)) {
            let mut batch_vectors = self
                .retry
                .execute(|| self.send_request(batch))
                .await
                .map_err(|failure| DomainError::EmbeddingFailed(failure.message))?;
            vectors.append(&mut batch_vectors);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        let vectors = self.call_batched(&[text.to_string()]).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::EmbeddingFailed("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.call_batched(texts).await
    }

    fn max_batch_size(&self) -> usize {
        self.config.max_batch_size
    }
}

// -- Wire types --

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}
