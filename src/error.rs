use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::llm::LlmError;
use crate::rate_limit::{RateLimitDecision, RateLimitError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited(RateLimitDecision),

    #[error("Rate limit store error: {0}")]
    RateLimitStore(#[from] RateLimitError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Model error: {0}")]
    Upstream(#[from] LlmError),

    #[error("Model output could not be parsed")]
    InvalidModelOutput,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized"),
            AppError::RateLimited(decision) => {
                let body = json!({
                    "error": "Rate limit exceeded",
                    "limit": decision.limit,
                    "remaining": decision.remaining,
                    "reset": decision.reset_millis(),
                });
                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                decision.write_headers(response.headers_mut());
                return response;
            }
            AppError::RateLimitStore(e) => {
                // Guest traffic fails closed while the counter store is down
                tracing::error!(error = %e, "rate limit store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Service temporarily unavailable. Please try again later.",
                )
            }
            AppError::Validation(msg) => {
                return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response();
            }
            AppError::Upstream(LlmError::Timeout) => (
                StatusCode::GATEWAY_TIMEOUT,
                "Slow Internet Connection. Please try again later.",
            ),
            AppError::Upstream(e) => {
                tracing::error!(error = %e, "model call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "Failed to process request. Please try again later.",
                )
            }
            AppError::InvalidModelOutput => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid response format. Please try again.",
            ),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to process request. Please try again later.",
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
