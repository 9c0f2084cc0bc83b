//! HTTP error envelope: map domain errors to status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::domain::errors::DomainError;

/// A failure response: `{success: false, error: <kind>, message?}`.
/// Messages are included only in development mode; stack traces never leak.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: Option<String>,
}

impl ApiError {
    pub fn from_domain(error: &DomainError, development: bool) -> Self {
        let (status, kind) = match error {
            DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            DomainError::DocumentNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            DomainError::Constraint(_) => (StatusCode::BAD_REQUEST, "persistence_error"),
            DomainError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_error"),
            DomainError::ChatService(_)
            | DomainError::SummaryFailed(_)
            | DomainError::EmbeddingFailed(_) => (StatusCode::BAD_GATEWAY, "remote_service_error"),
            DomainError::Serialization(_) | DomainError::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        Self {
            status,
            kind,
            message: development.then(|| error.to_string()),
        }
    }

    pub fn validation(message: impl Into<String>, development: bool) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation_error",
            message: development.then(|| message.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "error": self.kind,
        });
        if let Some(message) = self.message {
            body["message"] = json!(message);
        }
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                DomainError::DocumentNotFound(Uuid::new_v4()),
                StatusCode::NOT_FOUND,
            ),
            (DomainError::Constraint("dup".into()), StatusCode::BAD_REQUEST),
            (
                DomainError::Database("io".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (DomainError::ChatService("502".into()), StatusCode::BAD_GATEWAY),
            (
                DomainError::SummaryFailed("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DomainError::EmbeddingFailed("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                DomainError::DimensionMismatch { left: 2, right: 3 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(ApiError::from_domain(&error, false).status, expected);
        }
    }

    #[test]
    fn test_message_only_in_development() {
        let error = DomainError::Validation("missing field".into());
        assert!(ApiError::from_domain(&error, false).message.is_none());
        assert_eq!(
            ApiError::from_domain(&error, true).message.as_deref(),
            Some("Validation failed: missing field")
        );
    }
}
