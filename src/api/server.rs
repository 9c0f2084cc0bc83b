//! Thin HTTP edge: JSON routing over the ingestion and retrieval services.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::domain::models::ingest::{IngestReport, IngestRequest};
use crate::domain::models::query::{RetrieveRequest, RetrieveResponse};
use crate::domain::ports::repository::{ChunkRepository, DocumentRepository};
use crate::services::ingestion::IngestionService;
use crate::services::retriever::Retriever;

#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub retriever: Arc<Retriever>,
    pub documents: Arc<dyn DocumentRepository>,
    pub chunks: Arc<dyn ChunkRepository>,
    pub pool: SqlitePool,
    pub development: bool,
}

impl AppState {
    fn map_error(&self, error: &crate::domain::errors::DomainError) -> ApiError {
        ApiError::from_domain(error, self.development)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/documents", post(ingest_document))
        .route("/api/documents/{id}", get(get_document).delete(delete_document))
        .route("/api/retrieve", post(retrieve))
        .with_state(state)
}

/// Bind and serve until the task is cancelled.
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&state.pool)
        .await
        .map_err(|e| state.map_error(&e.into()))?;
    Ok(Json(json!({"status": "ok"})))
}

async fn ingest_document(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<IngestReport>, ApiError> {
    let request: IngestRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::validation(e.to_string(), state.development))?;

    let report = state
        .ingestion
        .ingest(request, None)
        .await
        .map_err(|e| state.map_error(&e))?;

    Ok(Json(report))
}

async fn retrieve(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    let request: RetrieveRequest = serde_json::from_value(body)
        .map_err(|e| ApiError::validation(e.to_string(), state.development))?;

    let response = state
        .retriever
        .retrieve(request)
        .await
        .map_err(|e| state.map_error(&e))?;

    Ok(Json(response))
}

async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let document = state
        .documents
        .get(id)
        .await
        .map_err(|e| state.map_error(&e))?
        .ok_or_else(|| {
            state.map_error(&crate::domain::errors::DomainError::DocumentNotFound(id))
        })?;

    let stats = state
        .chunks
        .document_stats(id)
        .await
        .map_err(|e| state.map_error(&e))?;

    Ok(Json(json!({
        "document_id": document.id,
        "title": document.title,
        "type": document.doc_type,
        "project_name": document.project_name,
        "metadata": document.metadata,
        "created_at": document.created_at.to_rfc3339(),
        "parent_chunks": stats.parent_chunks,
        "child_chunks": stats.child_chunks,
        "embeddings": stats.embeddings,
    })))
}

async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .ingestion
        .delete_document(id)
        .await
        .map_err(|e| state.map_error(&e))?;

    Ok(Json(json!({"success": true, "document_id": id})))
}
