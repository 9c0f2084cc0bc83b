//! SQLite implementation of the ChunkRepository.
//!
//! Vector search runs through the sqlite-vec extension's
//! `vec_distance_cosine` when the extension is loaded, and falls back to a
//! pure-Rust cosine scan otherwise. Embeddings are little-endian f32 BLOBs in
//! both cases, so the two paths share storage.

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::chunk::{ChunkStrategy, ParentWrite};
use crate::domain::models::document::DocumentType;
use crate::domain::models::query::{ChunkMatch, VectorQuery};
use crate::domain::ports::repository::{ChunkRepository, DocumentStats};

/// Which distance implementation the store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorImplementation {
    /// sqlite-vec extension with SIMD-accelerated `vec_distance_cosine`.
    NativeVec,
    /// Pure-Rust cosine scan over fetched rows.
    PureRust,
}

#[derive(Clone)]
pub struct SqliteChunkRepository {
    pool: SqlitePool,
    implementation: VectorImplementation,
}

impl SqliteChunkRepository {
    /// Create a repository, probing once for the sqlite-vec extension.
    pub async fn new(pool: SqlitePool) -> Self {
        let implementation = Self::detect_vec_extension(&pool).await;
        Self {
            pool,
            implementation,
        }
    }

    async fn detect_vec_extension(pool: &SqlitePool) -> VectorImplementation {
        match sqlx::query("SELECT vec_version() AS version")
            .fetch_optional(pool)
            .await
        {
            Ok(Some(row)) => {
                let version: String = row
                    .try_get("version")
                    .unwrap_or_else(|_| "unknown".to_string());
                tracing::info!(version, "sqlite-vec extension active");
                VectorImplementation::NativeVec
            }
            Ok(None) | Err(_) => {
                tracing::info!("sqlite-vec extension not available, using pure-Rust cosine scan");
                VectorImplementation::PureRust
            }
        }
    }

    pub fn implementation(&self) -> VectorImplementation {
        self.implementation
    }

    /// Serialize an embedding to little-endian bytes.
    pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize an embedding from little-endian bytes.
    pub fn bytes_to_embedding(bytes: &[u8]) -> DomainResult<Vec<f32>> {
        if bytes.len() % 4 != 0 {
            return Err(DomainError::Database(
                "invalid embedding byte length".to_string(),
            ));
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect())
    }

    /// Cosine distance; `f32::MAX` for mismatched or zero-magnitude vectors so
    /// such rows sort last.
    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return f32::MAX;
        }
        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if mag_a == 0.0 || mag_b == 0.0 {
            return f32::MAX;
        }
        1.0 - (dot / (mag_a * mag_b))
    }

    fn match_from_row(row: &sqlx::sqlite::SqliteRow, distance: f32) -> DomainResult<ChunkMatch> {
        let document_id_str: String = row.get("document_id");
        let document_id = Uuid::parse_str(&document_id_str)
            .map_err(|e| DomainError::Database(format!("invalid document id: {e}")))?;
        let doc_type: String = row.get("doc_type");

        Ok(ChunkMatch {
            document_id,
            document_title: row.get("title"),
            project_name: row.get("project_name"),
            document_type: DocumentType::parse(&doc_type),
            parent_chunk_content: row.get("parent_content"),
            parent_chunk_summary: row.get("parent_summary"),
            child_chunk_content: row.get("child_content"),
            distance,
        })
    }

    async fn search_native(&self, query: &VectorQuery) -> DomainResult<Vec<ChunkMatch>> {
        let embedding_bytes = Self::embedding_to_bytes(&query.embedding);

        let sql = if query.project_name.is_some() {
            r#"
            SELECT d.id AS document_id, d.title, d.project_name, d.doc_type,
                   p.content AS parent_content, p.summary AS parent_summary,
                   c.content AS child_content,
                   vec_distance_cosine(e.embedding, ?) AS distance
            FROM chunk_embeddings e
            JOIN child_chunks c ON c.id = e.child_chunk_id
            JOIN parent_chunks p ON p.id = c.parent_chunk_id
            JOIN documents d ON d.id = p.document_id
            WHERE e.embedding_type = 'content' AND d.project_name = ?
            ORDER BY distance ASC
            LIMIT ?
            "#
        } else {
            r#"
            SELECT d.id AS document_id, d.title, d.project_name, d.doc_type,
                   p.content AS parent_content, p.summary AS parent_summary,
                   c.content AS child_content,
                   vec_distance_cosine(e.embedding, ?) AS distance
            FROM chunk_embeddings e
            JOIN child_chunks c ON c.id = e.child_chunk_id
            JOIN parent_chunks p ON p.id = c.parent_chunk_id
            JOIN documents d ON d.id = p.document_id
            WHERE e.embedding_type = 'content'
            ORDER BY distance ASC
            LIMIT ?
            "#
        };

        let rows = if let Some(project) = &query.project_name {
            sqlx::query(sql)
                .bind(&embedding_bytes)
                .bind(project)
                .bind(query.limit as i64)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query(sql)
                .bind(&embedding_bytes)
                .bind(query.limit as i64)
                .fetch_all(&self.pool)
                .await?
        };

        let max_distance = 1.0 - query.min_similarity;
        let mut matches = Vec::with_capacity(rows.len());
        for row in rows {
            let distance: f32 = row.get("distance");
            if distance > max_distance {
                continue;
            }
            matches.push(Self::match_from_row(&row, distance)?);
        }
        Ok(matches)
    }

    async fn search_fallback(&self, query: &VectorQuery) -> DomainResult<Vec<ChunkMatch>> {
        let sql = if query.project_name.is_some() {
            r#"
            SELECT d.id AS document_id, d.title, d.project_name, d.doc_type,
                   p.content AS parent_content, p.summary AS parent_summary,
                   c.content AS child_content, e.embedding
            FROM chunk_embeddings e
            JOIN child_chunks c ON c.id = e.child_chunk_id
            JOIN parent_chunks p ON p.id = c.parent_chunk_id
            JOIN documents d ON d.id = p.document_id
            WHERE e.embedding_type = 'content' AND d.project_name = ?
            "#
        } else {
            r#"
            SELECT d.id AS document_id, d.title, d.project_name, d.doc_type,
                   p.content AS parent_content, p.summary AS parent_summary,
                   c.content AS child_content, e.embedding
            FROM chunk_embeddings e
            JOIN child_chunks c ON c.id = e.child_chunk_id
            JOIN parent_chunks p ON p.id = c.parent_chunk_id
            JOIN documents d ON d.id = p.document_id
            WHERE e.embedding_type = 'content'
            "#
        };

        let rows = if let Some(project) = &query.project_name {
            sqlx::query(sql).bind(project).fetch_all(&self.pool).await?
        } else {
            sqlx::query(sql).fetch_all(&self.pool).await?
        };

        let max_distance = 1.0 - query.min_similarity;
        let mut matches = Vec::new();
        for row in rows {
            let embedding_bytes: Vec<u8> = row.get("embedding");
            let embedding = Self::bytes_to_embedding(&embedding_bytes)?;
            let distance = Self::cosine_distance(&query.embedding, &embedding);
            if distance > max_distance {
                continue;
            }
            matches.push(Self::match_from_row(&row, distance)?);
        }

        matches.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(query.limit);
        Ok(matches)
    }

    async fn find_strategy(&self, strategy: &ChunkStrategy) -> DomainResult<Option<i64>> {
        let row = sqlx::query(
            "SELECT id FROM chunk_strategies \
             WHERE parent_chunk_size = ? AND child_chunk_size = ? AND overlap_percent = ?",
        )
        .bind(strategy.parent_chunk_size as i64)
        .bind(strategy.child_chunk_size as i64)
        .bind(i64::from(strategy.overlap_percent))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.get::<i64, _>("id")))
    }
}

#[async_trait]
impl ChunkRepository for SqliteChunkRepository {
    async fn ensure_strategy(&self, strategy: &ChunkStrategy) -> DomainResult<i64> {
        if let Some(id) = self.find_strategy(strategy).await? {
            return Ok(id);
        }

        let inserted = sqlx::query(
            "INSERT INTO chunk_strategies (parent_chunk_size, child_chunk_size, overlap_percent, name) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(strategy.parent_chunk_size as i64)
        .bind(strategy.child_chunk_size as i64)
        .bind(i64::from(strategy.overlap_percent))
        .bind(&strategy.name)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(result) => Ok(result.last_insert_rowid()),
            Err(e) => {
                let lost_race =
                    matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
                if lost_race {
                    // The unique triple guarantees the row exists now.
                    self.find_strategy(strategy).await?.ok_or_else(|| {
                        DomainError::Database("strategy vanished after conflict".to_string())
                    })
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn insert_tree(&self, parents: &[ParentWrite]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        for entry in parents {
            let parent = &entry.parent;
            sqlx::query(
                r#"INSERT INTO parent_chunks
                   (id, document_id, strategy_id, parent_index, content, summary, start_position, end_position)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(parent.id.to_string())
            .bind(parent.document_id.to_string())
            .bind(parent.strategy_id)
            .bind(parent.parent_index as i64)
            .bind(&parent.content)
            .bind(&parent.summary)
            .bind(parent.start_position as i64)
            .bind(parent.end_position as i64)
            .execute(&mut *tx)
            .await?;

            for child_write in &entry.children {
                let child = &child_write.child;
                sqlx::query(
                    r#"INSERT INTO child_chunks
                       (id, parent_chunk_id, chunk_index, content, start_position, end_position)
                       VALUES (?, ?, ?, ?, ?, ?)"#,
                )
                .bind(child.id.to_string())
                .bind(child.parent_chunk_id.to_string())
                .bind(child.chunk_index as i64)
                .bind(&child.content)
                .bind(child.start_position as i64)
                .bind(child.end_position as i64)
                .execute(&mut *tx)
                .await?;

                if let Some(embedding) = &child_write.embedding {
                    sqlx::query(
                        r#"INSERT INTO chunk_embeddings
                           (id, child_chunk_id, embedding, embedding_type, model, created_at)
                           VALUES (?, ?, ?, ?, ?, ?)"#,
                    )
                    .bind(embedding.id.to_string())
                    .bind(embedding.child_chunk_id.to_string())
                    .bind(Self::embedding_to_bytes(&embedding.embedding))
                    .bind(embedding.embedding_type.as_str())
                    .bind(&embedding.model)
                    .bind(embedding.created_at.to_rfc3339())
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search_children(&self, query: &VectorQuery) -> DomainResult<Vec<ChunkMatch>> {
        match self.implementation {
            VectorImplementation::NativeVec => self.search_native(query).await,
            VectorImplementation::PureRust => self.search_fallback(query).await,
        }
    }

    async fn document_stats(&self, document_id: Uuid) -> DomainResult<DocumentStats> {
        let id = document_id.to_string();

        let parents: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM parent_chunks WHERE document_id = ?")
                .bind(&id)
                .fetch_one(&self.pool)
                .await?;

        let children: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM child_chunks c \
             JOIN parent_chunks p ON p.id = c.parent_chunk_id WHERE p.document_id = ?",
        )
        .bind(&id)
        .fetch_one(&self.pool)
        .await?;

        let embeddings: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM chunk_embeddings e \
             JOIN child_chunks c ON c.id = e.child_chunk_id \
             JOIN parent_chunks p ON p.id = c.parent_chunk_id WHERE p.document_id = ?",
        )
        .bind(&id)
        .fetch_one(&self.pool)
        .await?;

        Ok(DocumentStats {
            parent_chunks: parents as usize,
            child_chunks: children as usize,
            embeddings: embeddings as usize,
        })
    }
}
