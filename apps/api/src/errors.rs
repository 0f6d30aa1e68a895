use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ai_client::AiClientError;
use crate::session::SessionError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session store error: {0}")]
    Session(#[from] SessionError),

    #[error("AI service error: {0}")]
    AiService(#[from] AiClientError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Builds a validation error listing every offending field.
    pub fn fields(errors: &[(&str, &str)]) -> Self {
        let joined = errors
            .iter()
            .map(|(field, problem)| format!("{field}: {problem}"))
            .collect::<Vec<_>>()
            .join("; ");
        AppError::Validation(joined)
    }
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Session(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SESSION_STORE_ERROR"),
            AppError::AiService(_) => (StatusCode::BAD_GATEWAY, "AI_SERVICE_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Client-facing message. Server-side failures never leak their cause.
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            AppError::Unauthorized => "Send an x-user-id or x-session-id header".to_string(),
            AppError::Database(_) => "A database error occurred".to_string(),
            AppError::Session(_) => "A session storage error occurred".to_string(),
            AppError::AiService(_) => "The gift assistant service is unreachable".to_string(),
            AppError::Internal(_) => "An internal server error occurred".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{code}: {self:?}");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.public_message()
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::fields(&[("occasion", "is required")]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fields_joins_all_problems() {
        let err = AppError::fields(&[("occasion", "is required"), ("max_budget", "must be >= 0")]);
        assert_eq!(
            err.to_string(),
            "Validation error: occasion: is required; max_budget: must be >= 0"
        );
    }

    #[test]
    fn test_server_errors_hide_cause() {
        let err = AppError::Internal(anyhow::anyhow!("disk on fire"));
        assert_eq!(err.public_message(), "An internal server error occurred");
        assert_eq!(err.status_and_code().1, "INTERNAL_ERROR");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Conflict("busy".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::NotFound("gift 9".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::AiService(AiClientError::Status { status: 503 })
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
