//! API error types and HTTP status mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::container::ContainerError;
use crate::engine::EngineError;

/// API error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// API error type that can be converted to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Operation not permitted in the instance's current state.
    Conflict(String),
    /// The scheduler engine rejected or failed the operation.
    SchedulerProblem(String),
    /// Internal server error (e.g. config store failure).
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::SchedulerProblem(msg) => {
                (StatusCode::BAD_GATEWAY, "SCHEDULER_PROBLEM", msg)
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ContainerError> for ApiError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::NotFound(_) => ApiError::NotFound(err.to_string()),
            ContainerError::InvalidState { .. } => ApiError::Conflict(err.to_string()),
            ContainerError::Engine(e) => e.into(),
            ContainerError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotInitialized => ApiError::Conflict(err.to_string()),
            EngineError::JobNotFound(_) | EngineError::TriggerNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            _ => ApiError::SchedulerProblem(err.to_string()),
        }
    }
}
