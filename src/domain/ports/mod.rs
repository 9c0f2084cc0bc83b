//! Ports: traits implemented by adapters.

pub mod chat;
pub mod embedding;
pub mod repository;

pub use chat::{ChatClient, ChatMessage, ChatRequest};
pub use embedding::EmbeddingProvider;
pub use repository::{ChunkRepository, DocumentRepository, DocumentStats};
