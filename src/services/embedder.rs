//! Context-enriched embedding pipeline over an embedding provider.
//!
//! Blank inputs are never sent to the remote endpoint: they keep a
//! zero-length placeholder vector in the result so callers can skip the row
//! while input-index mapping stays intact.

use std::sync::Arc;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::embedding::EmbeddingProvider;

/// Context assembled around a child span at ingest time.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingContext {
    pub title: Option<String>,
    pub doc_type: Option<String>,
    pub summary: Option<String>,
}

/// Embedding pipeline wrapping a provider port.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }

    pub fn model(&self) -> &str {
        self.provider.model()
    }

    /// Embed a single text. Blank input yields a zero-length placeholder.
    pub async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.provider.embed(text).await
    }

    /// Embed many texts, preserving input order. Blank inputs are filtered
    /// before the remote call and restored as zero-length placeholders.
    pub async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];

        let mut indices = Vec::new();
        let mut non_blank = Vec::new();
        for (index, text) in texts.iter().enumerate() {
            if !text.trim().is_empty() {
                indices.push(index);
                non_blank.push(text.clone());
            }
        }

        if non_blank.is_empty() {
            return Ok(vectors);
        }

        let embedded = self.provider.embed_batch(&non_blank).await?;
        if embedded.len() != non_blank.len() {
            return Err(DomainError::EmbeddingFailed(format!(
                "provider returned {} vectors for {} inputs",
                embedded.len(),
                non_blank.len()
            )));
        }

        for (index, vector) in indices.into_iter().zip(embedded) {
            vectors[index] = vector;
        }

        Ok(vectors)
    }

    /// Compose the enriched input embedded for a child span. Absent fields
    /// are dropped from the assembled string.
    pub fn compose_contextual(content: &str, context: &EmbeddingContext) -> String {
        let mut parts = Vec::new();
        if let Some(title) = context.title.as_deref().filter(|t| !t.trim().is_empty()) {
            parts.push(format!("[title] {title}"));
        }
        if let Some(doc_type) = context.doc_type.as_deref().filter(|t| !t.trim().is_empty()) {
            parts.push(format!("[type] {doc_type}"));
        }
        if let Some(summary) = context.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            parts.push(format!("[summary] {summary}"));
        }
        parts.push(format!("[content] {content}"));
        parts.join("\n")
    }

    /// Embed a child span with its surrounding context.
    pub async fn embed_contextual(
        &self,
        content: &str,
        context: &EmbeddingContext,
    ) -> DomainResult<Vec<f32>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.embed(&Self::compose_contextual(content, context)).await
    }
}

/// Cosine similarity between two vectors, in [-1, 1]. Zero-magnitude vectors
/// yield 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> DomainResult<f32> {
    if a.len() != b.len() {
        return Err(DomainError::DimensionMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (mag_a * mag_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingProvider {
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl RecordingProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }

        fn vector_for(text: &str) -> Vec<f32> {
            vec![text.chars().count() as f32, 1.0]
        }
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingProvider {
        fn model(&self) -> &str {
            "recording"
        }

        async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
            self.calls.lock().unwrap().push(vec![text.to_string()]);
            Ok(Self::vector_for(text))
        }

        async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.to_vec());
            Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
        }

        fn max_batch_size(&self) -> usize {
            100
        }
    }

    #[tokio::test]
    async fn test_blank_inputs_get_placeholders() {
        let provider = Arc::new(RecordingProvider::new());
        let embedder = Embedder::new(provider.clone());

        let texts = vec![
            "first".to_string(),
            "  ".to_string(),
            "third".to_string(),
            String::new(),
        ];
        let vectors = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(vectors.len(), 4);
        assert!(!vectors[0].is_empty());
        assert!(vectors[1].is_empty());
        assert!(!vectors[2].is_empty());
        assert!(vectors[3].is_empty());

        // Only the non-blank inputs reached the provider.
        let calls = provider.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["first".to_string(), "third".to_string()]);
    }

    #[tokio::test]
    async fn test_all_blank_batch_makes_no_remote_call() {
        let provider = Arc::new(RecordingProvider::new());
        let embedder = Embedder::new(provider.clone());

        let vectors = embedder
            .embed_batch(&[" ".to_string(), String::new()])
            .await
            .unwrap();

        assert!(vectors.iter().all(Vec::is_empty));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_compose_contextual_drops_absent_fields() {
        let full = Embedder::compose_contextual(
            "body text",
            &EmbeddingContext {
                title: Some("Setup guide".to_string()),
                doc_type: Some("TECH_DOC".to_string()),
                summary: Some("How to configure.".to_string()),
            },
        );
        assert_eq!(
            full,
            "[title] Setup guide\n[type] TECH_DOC\n[summary] How to configure.\n[content] body text"
        );

        let bare = Embedder::compose_contextual("body text", &EmbeddingContext::default());
        assert_eq!(bare, "[content] body text");

        let partial = Embedder::compose_contextual(
            "body text",
            &EmbeddingContext {
                title: None,
                doc_type: Some("API_DOC".to_string()),
                summary: None,
            },
        );
        assert_eq!(partial, "[type] API_DOC\n[content] body text");
    }

    #[tokio::test]
    async fn test_embed_contextual_sends_enriched_input() {
        let provider = Arc::new(RecordingProvider::new());
        let embedder = Embedder::new(provider.clone());

        let vector = embedder
            .embed_contextual(
                "child span text",
                &EmbeddingContext {
                    title: Some("Guide".to_string()),
                    doc_type: Some("TECH_DOC".to_string()),
                    summary: Some("overview".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(!vector.is_empty());
        let calls = provider.calls.lock().unwrap();
        assert_eq!(
            calls[0][0],
            "[title] Guide\n[type] TECH_DOC\n[summary] overview\n[content] child span text"
        );
    }

    #[tokio::test]
    async fn test_embed_contextual_blank_content_skipped() {
        let provider = Arc::new(RecordingProvider::new());
        let embedder = Embedder::new(provider.clone());

        let vector = embedder
            .embed_contextual("  ", &EmbeddingContext::default())
            .await
            .unwrap();

        assert!(vector.is_empty());
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cosine_similarity_basics() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &a).unwrap() > 0.999);
        assert!(cosine_similarity(&a, &b).unwrap().abs() < 1e-6);

        let opposite = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &opposite).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_symmetry() {
        let a = vec![0.3, 0.7, -0.2];
        let b = vec![-0.5, 0.1, 0.9];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-6);
        assert!((-1.0..=1.0).contains(&ab));
    }

    #[test]
    fn test_cosine_dimension_mismatch() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(matches!(
            cosine_similarity(&a, &b),
            Err(DomainError::DimensionMismatch { left: 2, right: 3 })
        ));
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = vec![0.0, 0.0];
        let unit = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &unit).unwrap(), 0.0);
    }
}
