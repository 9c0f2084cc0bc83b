//! Shared test fixtures: in-memory database, scripted chat client, and a
//! deterministic embedding provider.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use recall::domain::errors::{DomainError, DomainResult};
use recall::domain::models::chunk::{
    ChildChunk, ChildWrite, ChunkEmbedding, ChunkStrategy, EmbeddingType, ParentChunk, ParentWrite,
};
use recall::domain::models::document::{Document, DocumentType};
use recall::domain::ports::chat::{ChatClient, ChatRequest};
use recall::domain::ports::embedding::EmbeddingProvider;
use recall::domain::ports::repository::{ChunkRepository, DocumentRepository};

/// In-memory pool with migrations applied. One connection so every query
/// sees the same database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to create test pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

/// Chat client that pops scripted responses, optionally falling back to a
/// default response when the script runs dry.
pub struct ScriptedChat {
    responses: Mutex<Vec<DomainResult<String>>>,
    fallback: Option<String>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChat {
    pub fn new(responses: Vec<DomainResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with the same content once the script is exhausted.
    pub fn always(content: &str) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: Some(content.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn complete(&self, request: ChatRequest) -> DomainResult<String> {
        self.requests.lock().unwrap().push(request);
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return match &self.fallback {
                Some(content) => Ok(content.clone()),
                None => Err(DomainError::ChatService("no scripted response".to_string())),
            };
        }
        responses.remove(0)
    }
}

/// Embedding provider returning a constant vector, with per-text overrides.
/// Records every batch it receives.
pub struct MockEmbeddings {
    default_vector: Vec<f32>,
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    pub calls: Mutex<Vec<Vec<String>>>,
}

impl MockEmbeddings {
    pub fn new(default_vector: Vec<f32>) -> Self {
        Self {
            default_vector,
            overrides: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_vector(self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides
            .lock()
            .unwrap()
            .insert(text.to_string(), vector);
        self
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        self.overrides
            .lock()
            .unwrap()
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_vector.clone())
    }

    pub fn embedded_texts(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().flatten().cloned().collect()
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddings {
    fn model(&self) -> &str {
        "mock-embedding"
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        self.calls.lock().unwrap().push(vec![text.to_string()]);
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        self.calls.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn max_batch_size(&self) -> usize {
        100
    }
}

/// Insert one document with a single parent/child/embedding row, bypassing
/// the remote pipeline. Returns the document id.
pub async fn seed_document(
    documents: &Arc<dyn DocumentRepository>,
    chunks: &Arc<dyn ChunkRepository>,
    project: &str,
    title: Option<&str>,
    child_content: &str,
    vector: Vec<f32>,
) -> Uuid {
    let document = Document::new(
        child_content.to_string(),
        DocumentType::GeneralDoc,
        project.to_string(),
        title.map(String::from),
        None,
    );
    documents.insert(&document).await.expect("insert document");

    let strategy_id = chunks
        .ensure_strategy(&ChunkStrategy::default())
        .await
        .expect("ensure strategy");

    let parent = ParentChunk {
        id: Uuid::new_v4(),
        document_id: document.id,
        strategy_id,
        parent_index: 0,
        content: child_content.to_string(),
        summary: format!("summary of {child_content}"),
        start_position: 0,
        end_position: child_content.chars().count(),
    };
    let child = ChildChunk {
        id: Uuid::new_v4(),
        parent_chunk_id: parent.id,
        chunk_index: 0,
        content: child_content.to_string(),
        start_position: 0,
        end_position: child_content.chars().count(),
    };
    let embedding = ChunkEmbedding {
        id: Uuid::new_v4(),
        child_chunk_id: child.id,
        embedding: vector,
        embedding_type: EmbeddingType::Content,
        model: "mock-embedding".to_string(),
        created_at: Utc::now(),
    };

    chunks
        .insert_tree(&[ParentWrite {
            parent,
            children: vec![ChildWrite {
                child,
                embedding: Some(embedding),
            }],
        }])
        .await
        .expect("insert tree");

    document.id
}

/// Unit vector at the given angle in the x-y plane; handy for building rows
/// with a known cosine ordering against the query vector [1, 0].
pub fn unit_vector(angle_radians: f32) -> Vec<f32> {
    vec![angle_radians.cos(), angle_radians.sin()]
}
