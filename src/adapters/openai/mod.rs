//! OpenAI-compatible remote endpoint adapters.

pub mod chat;
pub mod embeddings;
pub mod retry;

pub use chat::OpenAiChatClient;
pub use embeddings::OpenAiEmbeddingProvider;
pub use retry::{RequestFailure, RetryPolicy};
