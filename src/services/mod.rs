//! Service layer: the indexing and retrieval pipeline.

pub mod chunker;
pub mod embedder;
pub mod ingestion;
pub mod query_transformer;
pub mod reranker;
pub mod retriever;
pub mod summarizer;

pub use chunker::Chunker;
pub use embedder::{cosine_similarity, Embedder, EmbeddingContext};
pub use ingestion::IngestionService;
pub use query_transformer::{classify_by_rules, QueryMode, QueryTransformer};
pub use reranker::Reranker;
pub use retriever::Retriever;
pub use summarizer::Summarizer;

/// Extract a JSON object or array from a model response.
///
/// Handles fenced code blocks and JSON embedded in surrounding prose. Returns
/// the trimmed input unchanged when no JSON-looking region is found; callers
/// surface the parse error.
pub fn extract_json_from_response(response: &str) -> String {
    let trimmed = response.trim();

    // ```json ... ``` blocks
    if let Some(rest) = trimmed.strip_prefix("```json") {
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
    }

    // ``` ... ``` blocks
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(end) = rest.rfind("```") {
            return rest[..end].trim().to_string();
        }
    }

    let looks_like_object = trimmed.starts_with('{') && trimmed.ends_with('}');
    let looks_like_array = trimmed.starts_with('[') && trimmed.ends_with(']');
    if looks_like_object || looks_like_array {
        return trimmed.to_string();
    }

    // JSON embedded in text: take the outermost object or array, whichever
    // opens first.
    let object_span = trimmed
        .find('{')
        .and_then(|start| trimmed.rfind('}').filter(|end| *end > start).map(|end| (start, end)));
    let array_span = trimmed
        .find('[')
        .and_then(|start| trimmed.rfind(']').filter(|end| *end > start).map(|end| (start, end)));

    let span = match (object_span, array_span) {
        (Some(object), Some(array)) => Some(if object.0 < array.0 { object } else { array }),
        (Some(object), None) => Some(object),
        (None, Some(array)) => Some(array),
        (None, None) => None,
    };

    match span {
        Some((start, end)) => trimmed[start..=end].to_string(),
        None => trimmed.to_string(),
    }
}
