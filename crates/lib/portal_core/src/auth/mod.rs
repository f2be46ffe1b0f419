//! Authentication and authorization logic.
//!
//! Provides token issuance and verification with revocation, credential
//! extraction, the API-key registry and the role/ownership evaluator. Nothing
//! in here performs I/O; every check runs on the request hot path.

pub mod api_keys;
pub mod credentials;
pub mod jwt;
pub mod rbac;
pub mod revocation;

use thiserror::Error;

/// Authentication and authorization failures.
///
/// Each variant carries exactly one user-visible message; the HTTP layer maps
/// variants to status codes through [`AuthError::kind`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Authorization header is required")]
    MissingHeader,

    #[error("Invalid authorization header format")]
    MalformedHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    Expired,

    #[error("Token has been revoked")]
    Revoked,

    #[error("API key is required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("User not found in context")]
    IdentityNotFound,

    #[error("User role not found in context")]
    RoleNotFound,

    #[error("Invalid user role type")]
    InvalidRoleType,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Access denied")]
    AccessDenied,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Token error: {0}")]
    TokenError(String),
}

/// Coarse failure taxonomy every check in the request chain resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    MalformedCredential,
    InvalidCredential,
    ExpiredCredential,
    RevokedCredential,
    InsufficientPermissions,
    AccessDenied,
    RateLimitExceeded,
    InternalInconsistency,
}

impl FailureKind {
    /// Credential failures are the only kinds the optional-auth chain may
    /// downgrade to an anonymous request.
    pub fn is_credential(self) -> bool {
        matches!(
            self,
            FailureKind::MissingCredential
                | FailureKind::MalformedCredential
                | FailureKind::InvalidCredential
                | FailureKind::ExpiredCredential
                | FailureKind::RevokedCredential
        )
    }
}

impl AuthError {
    /// Classify the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthError::MissingHeader
            | AuthError::MissingApiKey
            | AuthError::IdentityNotFound
            | AuthError::RoleNotFound => FailureKind::MissingCredential,
            AuthError::MalformedHeader => FailureKind::MalformedCredential,
            AuthError::InvalidToken | AuthError::InvalidApiKey => FailureKind::InvalidCredential,
            AuthError::Expired => FailureKind::ExpiredCredential,
            AuthError::Revoked => FailureKind::RevokedCredential,
            AuthError::InsufficientPermissions => FailureKind::InsufficientPermissions,
            AuthError::AccessDenied => FailureKind::AccessDenied,
            AuthError::RateLimitExceeded => FailureKind::RateLimitExceeded,
            AuthError::InvalidRoleType | AuthError::TokenError(_) => {
                FailureKind::InternalInconsistency
            }
        }
    }
}
