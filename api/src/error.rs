use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use catalog_core::CatalogError;
use serde_json::json;
use thiserror::Error;

/// API Result type
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Catalog(CatalogError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Catalog(CatalogError::DuplicateId(_)) => StatusCode::CONFLICT,
            ApiError::Catalog(CatalogError::Conflict { .. }) => StatusCode::CONFLICT,
            ApiError::Catalog(CatalogError::CycleDetected { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Catalog(CatalogError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Catalog(err) => err.kind(),
            ApiError::InvalidBody(_) => "invalid_input",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

/// Convert ApiError to HTTP response
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::debug!(status = status.as_u16(), error = %self, "Request failed");

        let body = Json(json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}
