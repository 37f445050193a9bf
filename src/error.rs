use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("failed to generate SQL: {0}")]
    Translation(String),

    #[error("unsafe query rejected: {0}")]
    UnsafeQuery(String),

    #[error("query execution failed: {0}")]
    QueryExecution(String),

    #[error("rate limit exceeded, try again later")]
    RateLimited,

    #[error("internal error")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) | ApiError::Translation(_) | ApiError::UnsafeQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::QueryExecution(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        // Internal detail stays in the logs; the database message is the one
        // piece of backend text callers are allowed to see.
        let detail = match &self {
            ApiError::Internal(msg) => {
                error!(error = %msg, "request failed");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ErrorBody { detail })).into_response()
    }
}
