//! Document model and document-type normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Document classification used to key summary prompts.
///
/// Incoming request values are free-form; `parse` applies the ingress
/// normalization (upper-case, dashes to underscores) and defaults unknown
/// values to `GeneralDoc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    ApiDoc,
    TechDoc,
    CodeLogicDoc,
    GeneralDoc,
}

impl DocumentType {
    /// Normalize a raw ingress value into a document type.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase().replace('-', "_");
        match normalized.as_str() {
            "API" | "API_DOC" => Self::ApiDoc,
            "TECH" | "TECH_DOC" => Self::TechDoc,
            "CODE" | "CODE_LOGIC" | "CODE_LOGIC_DOC" => Self::CodeLogicDoc,
            _ => Self::GeneralDoc,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApiDoc => "API_DOC",
            Self::TechDoc => "TECH_DOC",
            Self::CodeLogicDoc => "CODE_LOGIC_DOC",
            Self::GeneralDoc => "GENERAL_DOC",
        }
    }
}

/// A project-scoped source document. Content is immutable after ingest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub content: String,
    pub doc_type: DocumentType,
    pub project_name: String,
    pub title: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(
        content: String,
        doc_type: DocumentType,
        project_name: String,
        title: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            doc_type,
            project_name,
            title,
            metadata,
            created_at: Utc::now(),
        }
    }
}
