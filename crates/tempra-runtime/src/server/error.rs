//! API errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tempra_core::TempraError;
use thiserror::Error;

/// Errors returned by handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl From<TempraError> for ApiError {
    fn from(e: TempraError) -> Self {
        match e {
            TempraError::TokenNotFound(_) => ApiError::NotFound(e.to_string()),
            TempraError::InvalidDirective(_) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "TOKEN_NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_DIRECTIVE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tempra_core::Token;

    #[test]
    fn test_status_codes() {
        let not_found: ApiError = TempraError::TokenNotFound(Token::new("T1")).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let invalid: ApiError = TempraError::InvalidDirective("missing mode".into()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let other: ApiError = TempraError::Persistence("disk".into()).into();
        assert_eq!(other.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
