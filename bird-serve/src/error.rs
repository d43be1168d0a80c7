//! HTTP error responses
//!
//! Every error is rendered as `{"detail": "<message>"}` with a matching
//! status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use libbirdcast::BirdcastError;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }
}

impl From<BirdcastError> for ApiError {
    fn from(error: BirdcastError) -> Self {
        match error {
            BirdcastError::NotFound(detail) => Self::new(StatusCode::NOT_FOUND, detail),
            BirdcastError::InvalidInput(detail) | BirdcastError::NotConfigured(detail) => {
                Self::bad_request(detail)
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.detail);
        }
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        let err = ApiError::from(BirdcastError::NotFound("Post not found".to_string()));
        assert_eq!(err, ApiError::new(StatusCode::NOT_FOUND, "Post not found"));

        let err = ApiError::from(BirdcastError::InvalidInput("Post already published".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.detail, "Post already published");

        let err = ApiError::from(BirdcastError::NotConfigured("no creds".to_string()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = ApiError::from(BirdcastError::Publish("boom".to_string()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
