//! Domain errors for the recall retrieval service.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur across the indexing and retrieval pipeline.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Chat endpoint error: {0}")]
    ChatService(String),

    #[error("Summary generation failed: {0}")]
    SummaryFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Vector dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },
}

pub type DomainResult<T> = Result<T, DomainError>;

impl DomainError {
    /// True for unique/foreign-key violations surfaced by the store.
    pub fn is_constraint(&self) -> bool {
        matches!(self, DomainError::Constraint(_))
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() || db.is_foreign_key_violation() {
                return DomainError::Constraint(db.to_string());
            }
        }
        DomainError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
