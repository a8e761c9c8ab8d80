//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use engine::EngineError;
use event_store::EventStoreError;
use realtime::RealtimeError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Every error renders as `{"error": <code>, "message": <text>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Caller identity headers are missing or malformed.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed path or query parameter.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error("journal error: {0}")]
    Journal(#[from] EventStoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => match err {
                EngineError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
                EngineError::TableUnavailable(_)
                | EngineError::InvalidTransition(_)
                | EngineError::PrematureTransition(_)
                | EngineError::InvalidLineTransition(_)
                | EngineError::InsufficientStock { .. }
                | EngineError::AlreadyTerminal(_) => StatusCode::CONFLICT,
                EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                EngineError::ExternalDependencyFailed(_) => StatusCode::BAD_GATEWAY,
                EngineError::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Realtime(RealtimeError::OrderFilterRequired) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Realtime(_) => StatusCode::CONFLICT,
            ApiError::Journal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Engine(err) => err.code(),
            ApiError::Unauthenticated(_) => "unauthenticated",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Realtime(RealtimeError::OrderFilterRequired) => "validation_failed",
            ApiError::Realtime(_) => "subscription_closed",
            ApiError::Journal(_) => "fatal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::counter!("http_errors_total", "code" => self.code()).increment(1);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let mut body = serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        });
        if let ApiError::Engine(EngineError::InsufficientStock {
            sku,
            requested,
            available,
        }) = &self
        {
            body["details"] = serde_json::json!({
                "sku": sku,
                "requested": requested,
                "available": available,
            });
        }
        (status, axum::Json(body)).into_response()
    }
}
