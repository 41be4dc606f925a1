//! JSON error responses.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::registry::RegistryError;
use crate::routing::RequestError;

/// Failures surfaced to HTTP clients as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("request {index}: {source}")]
    BatchItem { index: usize, source: RequestError },

    #[error("batch of {0} requests exceeds the limit of {1}")]
    BatchTooLarge(usize, usize),

    /// Body missing, not JSON, or not the expected shape.
    #[error("invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::Validation(_))
            | ApiError::Request(_)
            | ApiError::BatchItem { .. }
            | ApiError::BatchTooLarge(..)
            | ApiError::Body(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = %status, error = %self, "Request rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
