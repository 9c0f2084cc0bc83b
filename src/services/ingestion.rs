//! Ingest orchestration: chunk, summarize, embed, persist.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::chunk::{
    ChildChunk, ChildWrite, ChunkEmbedding, ChunkStrategy, ParentChunk, ParentWrite,
};
use crate::domain::models::document::{Document, DocumentType};
use crate::domain::models::ingest::{IngestReport, IngestRequest, IngestStage, ProgressCallback};
use crate::domain::ports::repository::{ChunkRepository, DocumentRepository};
use crate::services::chunker::{Chunker, ParentSpan};
use crate::services::embedder::{Embedder, EmbeddingContext};
use crate::services::summarizer::Summarizer;

/// Stitches the chunker, summarizer, and embedder together and persists the
/// resulting tree. One parent/child tree is produced per configured strategy,
/// giving retrieval multiple granularities to match against.
pub struct IngestionService {
    documents: Arc<dyn DocumentRepository>,
    chunks: Arc<dyn ChunkRepository>,
    summarizer: Arc<Summarizer>,
    embedder: Arc<Embedder>,
    strategies: Vec<ChunkStrategy>,
}

impl IngestionService {
    pub fn new(
        documents: Arc<dyn DocumentRepository>,
        chunks: Arc<dyn ChunkRepository>,
        summarizer: Arc<Summarizer>,
        embedder: Arc<Embedder>,
        strategies: Vec<ChunkStrategy>,
    ) -> Self {
        Self {
            documents,
            chunks,
            summarizer,
            embedder,
            strategies,
        }
    }

    /// Ingest one document. The first failure aborts the request; writes are
    /// transactional per strategy only, so recovery from a partial ingest is
    /// an explicit delete followed by re-ingest.
    pub async fn ingest(
        &self,
        request: IngestRequest,
        progress: Option<ProgressCallback>,
    ) -> DomainResult<IngestReport> {
        if request.project_name.trim().is_empty() {
            return Err(DomainError::Validation(
                "project_name must not be empty".to_string(),
            ));
        }

        let doc_type = DocumentType::parse(&request.doc_type);
        let document = Document::new(
            request.content,
            doc_type,
            request.project_name,
            request.title,
            request.metadata,
        );
        self.documents.insert(&document).await?;

        tracing::info!(
            document_id = %document.id,
            project = %document.project_name,
            doc_type = doc_type.as_str(),
            chars = document.content.chars().count(),
            "ingesting document"
        );

        let mut parent_total = 0usize;
        let mut child_total = 0usize;
        let mut embedding_total = 0usize;
        let mut strategies_used = Vec::new();

        let strategy_count = self.strategies.len();
        for (index, strategy) in self.strategies.iter().enumerate() {
            let chunker = Chunker::new(strategy.clone())?;
            let tree = chunker.chunk_document(&document.content);
            report(&progress, IngestStage::Chunking, index + 1, strategy_count);

            if tree.is_empty() {
                continue;
            }

            let strategy_id = self.chunks.ensure_strategy(strategy).await?;
            let (parents, children, embeddings) = self
                .persist_strategy_tree(&document, strategy_id, &tree, &progress)
                .await?;

            parent_total += parents;
            child_total += children;
            embedding_total += embeddings;
            strategies_used.push(strategy.clone());
        }

        tracing::info!(
            document_id = %document.id,
            parents = parent_total,
            children = child_total,
            embeddings = embedding_total,
            "ingest complete"
        );

        Ok(IngestReport {
            document_id: document.id,
            title: document.title,
            doc_type,
            project_name: document.project_name,
            parent_chunks_created: parent_total,
            child_chunks_created: child_total,
            embeddings_created: embedding_total,
            strategies: strategies_used,
        })
    }

    /// Delete a document; the store cascades through its chunk tree.
    pub async fn delete_document(&self, id: Uuid) -> DomainResult<()> {
        self.documents.delete(id).await
    }

    async fn persist_strategy_tree(
        &self,
        document: &Document,
        strategy_id: i64,
        tree: &[ParentSpan],
        progress: &Option<ProgressCallback>,
    ) -> DomainResult<(usize, usize, usize)> {
        // Summaries, bounded fan-out, input order preserved.
        let summary_inputs: Vec<(String, DocumentType)> = tree
            .iter()
            .map(|parent| (parent.content.clone(), document.doc_type))
            .collect();
        let summaries = self.summarizer.summarize_batch(&summary_inputs).await?;
        report(progress, IngestStage::Summarizing, tree.len(), tree.len());

        // Flatten children across parents, composing the enriched input per
        // child from its parent's summary, the title, and the document type.
        let mut texts = Vec::new();
        for (parent, summary) in tree.iter().zip(&summaries) {
            let context = EmbeddingContext {
                title: document.title.clone(),
                doc_type: Some(document.doc_type.as_str().to_string()),
                summary: Some(summary.clone()),
            };
            for child in &parent.children {
                if child.content.trim().is_empty() {
                    texts.push(String::new());
                } else {
                    texts.push(Embedder::compose_contextual(&child.content, &context));
                }
            }
        }
        let vectors = self.embedder.embed_batch(&texts).await?;
        report(progress, IngestStage::Embedding, texts.len(), texts.len());

        // Build rows in document order.
        let mut writes = Vec::with_capacity(tree.len());
        let mut child_count = 0usize;
        let mut embedding_count = 0usize;
        let mut vector_iter = vectors.into_iter();

        for (parent_index, (parent, summary)) in tree.iter().zip(summaries).enumerate() {
            let parent_row = ParentChunk {
                id: Uuid::new_v4(),
                document_id: document.id,
                strategy_id,
                parent_index,
                content: parent.content.clone(),
                summary,
                start_position: parent.start,
                end_position: parent.end,
            };

            let mut children = Vec::with_capacity(parent.children.len());
            for (chunk_index, child) in parent.children.iter().enumerate() {
                let child_row = ChildChunk {
                    id: Uuid::new_v4(),
                    parent_chunk_id: parent_row.id,
                    chunk_index,
                    content: child.content.clone(),
                    start_position: child.start,
                    end_position: child.end,
                };
                let vector = vector_iter.next().unwrap_or_default();
                let embedding = if vector.is_empty() {
                    None
                } else {
                    embedding_count += 1;
                    Some(ChunkEmbedding::content(
                        child_row.id,
                        vector,
                        self.embedder.model().to_string(),
                    ))
                };
                children.push(ChildWrite {
                    child: child_row,
                    embedding,
                });
                child_count += 1;
            }

            writes.push(ParentWrite {
                parent: parent_row,
                children,
            });
        }

        self.chunks.insert_tree(&writes).await?;
        report(progress, IngestStage::Writing, writes.len(), writes.len());

        Ok((writes.len(), child_count, embedding_count))
    }
}

fn report(progress: &Option<ProgressCallback>, stage: IngestStage, current: usize, total: usize) {
    if let Some(callback) = progress {
        callback(stage, current, total);
    }
}
