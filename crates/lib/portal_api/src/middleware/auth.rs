//! Authentication stages and the typed request identity.
//!
//! The authentication stages store a [`Principal`] in the request extensions.
//! Handlers and later stages read it back only through the accessors and
//! extractors below, which fail closed.

use axum::extract::{FromRequestParts, Request};
use axum::http::Extensions;
use axum::http::request::Parts;
use portal_core::auth::{AuthError, credentials, rbac};
use portal_core::models::{Claims, Role};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;

/// Who the request was authenticated as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Bearer-token user.
    User(Claims),
    /// API-key caller, e.g. a payment provider webhook.
    Service { caller: String },
}

/// The authenticated principal, if any stage attached one.
pub fn principal(extensions: &Extensions) -> Option<&Principal> {
    extensions.get::<Principal>()
}

fn user(extensions: &Extensions) -> Option<&Claims> {
    match principal(extensions)? {
        Principal::User(claims) => Some(claims),
        Principal::Service { .. } => None,
    }
}

/// Subject (user ID) of the authenticated user.
pub fn subject(extensions: &Extensions) -> Option<&str> {
    user(extensions).map(|c| c.sub.as_str())
}

/// Email of the authenticated user.
pub fn email(extensions: &Extensions) -> Option<&str> {
    user(extensions).map(|c| c.email.as_str())
}

/// Role of the authenticated user.
///
/// No principal is `RoleNotFound`; a principal without a role (an API-key
/// caller) is `InvalidRoleType`.
pub fn role(extensions: &Extensions) -> Result<Role, AuthError> {
    match principal(extensions) {
        None => Err(AuthError::RoleNotFound),
        Some(Principal::User(claims)) => Ok(claims.role),
        Some(Principal::Service { .. }) => Err(AuthError::InvalidRoleType),
    }
}

/// `Authenticate` stage: bearer token required.
pub(crate) fn authenticate(state: &AppState, request: &mut Request) -> Result<(), AuthError> {
    let claims = verify_bearer(state, request)?;
    request.extensions_mut().insert(Principal::User(claims));
    Ok(())
}

/// `OptionalAuthenticate` stage: credential failures proceed anonymously.
pub(crate) fn authenticate_optional(
    state: &AppState,
    request: &mut Request,
) -> Result<(), AuthError> {
    match verify_bearer(state, request) {
        Ok(claims) => {
            request.extensions_mut().insert(Principal::User(claims));
            Ok(())
        }
        Err(err) if err.kind().is_credential() => {
            if err != AuthError::MissingHeader {
                debug!(error = %err, "optional auth: proceeding anonymously");
            }
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// `ApiKey` stage: key from the configured header, else the query string.
pub(crate) fn authenticate_api_key(
    state: &AppState,
    request: &mut Request,
) -> Result<(), AuthError> {
    let keys = &state.config.api_keys;
    let key = credentials::api_key(
        request.headers(),
        request.uri().query(),
        &keys.header,
        &keys.query_param,
    )?;
    let caller = keys.registry.authenticate(&key)?.to_string();
    debug!(%caller, "api key accepted");
    request
        .extensions_mut()
        .insert(Principal::Service { caller });
    Ok(())
}

/// `RequireRole` stage.
pub(crate) fn require_role(request: &Request, allowed: &[Role]) -> Result<(), AuthError> {
    match principal(request.extensions()) {
        Some(Principal::Service { .. }) => Err(AuthError::InvalidRoleType),
        Some(Principal::User(claims)) => rbac::require_role(Some(claims), allowed),
        None => rbac::require_role(None, allowed),
    }
}

fn verify_bearer(state: &AppState, request: &Request) -> Result<Claims, AuthError> {
    let token = credentials::bearer_token(request.headers())?;
    state.tokens.verify_access(token)
}

/// Extractor: the authenticated user's claims.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        user(&parts.extensions)
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::Auth(AuthError::IdentityNotFound))
    }
}

/// Extractor: the user's claims when the optional-auth stage found a valid token.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Claims>);

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(user(&parts.extensions).cloned()))
    }
}

/// Extractor: name of the API-key caller.
#[derive(Debug, Clone)]
pub struct ApiCaller(pub String);

impl<S> FromRequestParts<S> for ApiCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match principal(&parts.extensions) {
            Some(Principal::Service { caller }) => Ok(ApiCaller(caller.clone())),
            _ => Err(AppError::Auth(AuthError::IdentityNotFound)),
        }
    }
}
