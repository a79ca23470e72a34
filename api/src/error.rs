use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error")]
    Storage(#[from] sqlx::Error),

    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("stats update contention")]
    Contention,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(e) => {
                tracing::error!("storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Serialization(e) => {
                tracing::error!("serialization failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Contention => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal details stay out of the response body.
        let body = match &self {
            ApiError::Storage(_) | ApiError::Serialization(_) | ApiError::Contention => {
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        (status, body).into_response()
    }
}
