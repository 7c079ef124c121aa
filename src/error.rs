use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by an item store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised while resolving a recipe tree.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("item {0} not found")]
    ItemNotFound(i64),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidParameter(String),

    #[error("item {0} not found")]
    ItemNotFound(i64),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::ItemNotFound(id) => ApiError::ItemNotFound(id),
            ResolveError::Storage(e) => ApiError::Storage(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_api_error(err: &ApiError) -> Self {
        let message = err.to_string();
        match err {
            ApiError::InvalidParameter(_) => Self::new("bad_request", &message, 400),
            ApiError::ItemNotFound(_) => Self::new("not_found", &message, 404),
            ApiError::Storage(_) => Self::new("storage_error", &message, 500),
            ApiError::Serialization(_) => Self::new("serialization_error", &message, 500),
            ApiError::RateLimited => Self::new("rate_limit_exceeded", "Request rate limit exceeded", 429),
            ApiError::Internal(_) => Self::new("internal_error", &message, 500),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::from_api_error(&self);
        let status =
            StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::InvalidParameter("Invalid after parameter".into()), 400),
            (ApiError::ItemNotFound(7), 404),
            (ApiError::Storage(StoreError::Unavailable("down".into())), 500),
            (ApiError::RateLimited, 429),
            (ApiError::Internal("join".into()), 500),
        ];

        for (err, code) in cases {
            assert_eq!(err.into_response().status().as_u16(), code);
        }
    }

    #[test]
    fn test_resolve_error_conversion() {
        let err: ApiError = ResolveError::ItemNotFound(42).into();
        assert!(matches!(err, ApiError::ItemNotFound(42)));

        let body = ErrorResponse::from_api_error(&err);
        assert_eq!(body.message, "item 42 not found");
    }
}
