//! Application error types and the uniform error envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use portal_core::auth::{AuthError, FailureKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Error envelope returned by every failing request.
///
/// A copy is kept in the response extensions so the request boundary can
/// stamp `request_id` onto it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: u16,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorBody {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            error: error.into(),
            code: None,
            request_id: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl IntoResponse for ErrorBody {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, Json(self.clone())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal server error")]
    Internal(String),
}

/// Status for an authentication/authorization failure.
pub fn auth_status(err: &AuthError) -> StatusCode {
    match err.kind() {
        FailureKind::MissingCredential
        | FailureKind::MalformedCredential
        | FailureKind::InvalidCredential
        | FailureKind::ExpiredCredential
        | FailureKind::RevokedCredential => StatusCode::UNAUTHORIZED,
        FailureKind::InsufficientPermissions | FailureKind::AccessDenied => StatusCode::FORBIDDEN,
        FailureKind::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
        FailureKind::InternalInconsistency => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl AppError {
    /// The envelope this error renders as.
    pub fn body(&self) -> ErrorBody {
        match self {
            AppError::Auth(AuthError::RateLimitExceeded) => {
                ErrorBody::new(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded")
                    .with_code("RATE_LIMIT_EXCEEDED")
            }
            // Signing failures carry internal detail; never echo it.
            AppError::Auth(AuthError::TokenError(_)) => {
                ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
            AppError::Auth(e) => ErrorBody::new(auth_status(e), e.to_string()),
            AppError::Validation(m) => ErrorBody::new(StatusCode::BAD_REQUEST, m.as_str()),
            AppError::NotFound => ErrorBody::new(StatusCode::NOT_FOUND, "Not found"),
            AppError::Internal(_) => {
                ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) | AppError::Auth(AuthError::TokenError(detail)) = &self {
            tracing::error!(%detail, "internal error");
        }
        self.body().into_response()
    }
}
