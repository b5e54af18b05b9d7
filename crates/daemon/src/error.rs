use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::pricing::Provider;
use engine::EngineError;
use serde_json::json;

use crate::providers::ProviderError;

/// Error type for HTTP handlers.
///
/// Renders as `{"error": <message>, "code": <CODE>}` with a matching status.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No API key is configured for the provider.
    #[error("{0} is not configured")]
    ProviderUnavailable(Provider),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        AppError::NotFound { entity, id }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Engine(err) => match err {
                EngineError::ClipNotFound(_) | EngineError::MarkerNotFound(_) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                }
                _ => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string()),
            },
            AppError::ProviderUnavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "PROVIDER_UNAVAILABLE",
                self.to_string(),
            ),
            AppError::Provider(err) => {
                tracing::warn!(error = %err, "Provider call failed");
                (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", err.to_string())
            }
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
