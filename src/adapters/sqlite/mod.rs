//! SQLite persistence adapters.

pub mod chunk_repository;
pub mod connection;
pub mod document_repository;

pub use chunk_repository::{SqliteChunkRepository, VectorImplementation};
pub use connection::Database;
pub use document_repository::SqliteDocumentRepository;
