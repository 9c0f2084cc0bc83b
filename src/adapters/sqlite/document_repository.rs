//! SQLite implementation of the DocumentRepository.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::document::{Document, DocumentType};
use crate::domain::ports::repository::DocumentRepository;

#[derive(Clone)]
pub struct SqliteDocumentRepository {
    pool: SqlitePool,
}

impl SqliteDocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for SqliteDocumentRepository {
    async fn insert(&self, document: &Document) -> DomainResult<()> {
        let metadata_json = document
            .metadata
            .as_ref()
            .map(|m| serde_json::to_string(m))
            .transpose()?;

        sqlx::query(
            r#"INSERT INTO documents (id, content, doc_type, project_name, title, metadata, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(document.id.to_string())
        .bind(&document.content)
        .bind(document.doc_type.as_str())
        .bind(&document.project_name)
        .bind(&document.title)
        .bind(metadata_json)
        .bind(document.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, content, doc_type, project_name, title, metadata, created_at \
             FROM documents WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id_str: String = row.get("id");
        let id = Uuid::parse_str(&id_str)
            .map_err(|e| DomainError::Database(format!("invalid document id {id_str}: {e}")))?;
        let doc_type: String = row.get("doc_type");
        let metadata_str: Option<String> = row.get("metadata");
        let metadata = metadata_str
            .map(|s| serde_json::from_str(&s))
            .transpose()?;
        let created_at_str: String = row.get("created_at");
        let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| DomainError::Database(format!("invalid created_at: {e}")))?;

        Ok(Some(Document {
            id,
            content: row.get("content"),
            doc_type: DocumentType::parse(&doc_type),
            project_name: row.get("project_name"),
            title: row.get("title"),
            metadata,
            created_at,
        }))
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::DocumentNotFound(id));
        }

        Ok(())
    }
}
