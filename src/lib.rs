//! Recall - project-scoped document retrieval service.
//!
//! On ingest a document becomes a hierarchy of overlapping text spans:
//! parent spans carry context and a model-generated summary, child spans are
//! the retrieval unit and get context-enriched dense vectors. On query the
//! question is reshaped (direct / expansion / hypothetical document), matched
//! by vector nearest-neighbor over child spans, and reordered with an
//! LLM-scored relevance pass fused with vector similarity.

pub mod adapters;
pub mod api;
pub mod domain;
pub mod infrastructure;
pub mod services;
