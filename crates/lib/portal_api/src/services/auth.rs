//! Authentication service: token refresh and logout flows over `TokenService`.

use chrono::Utc;
use portal_core::auth::jwt::TokenService;
use portal_core::auth::{AuthError, rbac};
use portal_core::models::{Claims, Role, TokenPair};
use tracing::info;

use crate::error::AppResult;
use crate::models::{LogoutResponse, TokenResponse};

/// Issue a token pair for `subject` (used by the login integration and the CLI).
pub fn issue(
    tokens: &TokenService,
    subject: &str,
    role: Role,
    email: &str,
) -> AppResult<TokenResponse> {
    let pair = tokens.issue(subject, role, email)?;
    Ok(token_response(pair))
}

/// Exchange a refresh token for a new pair.
pub fn refresh(tokens: &TokenService, refresh_token: &str) -> AppResult<TokenResponse> {
    let pair = tokens.refresh(refresh_token)?;
    Ok(token_response(pair))
}

/// Revoke the caller's access token and, if given, their refresh token.
///
/// A refresh token belonging to another subject is refused with `AccessDenied`
/// unless the caller is an admin.
pub fn logout(
    tokens: &TokenService,
    caller: &Claims,
    refresh_token: Option<&str>,
) -> AppResult<LogoutResponse> {
    if let Some(token) = refresh_token {
        match tokens.verify(token) {
            Ok(target) => {
                if target.sub != caller.sub && !rbac::is_admin(caller) {
                    return Err(AuthError::AccessDenied.into());
                }
                tokens.revoke_claims(&target);
            }
            // Nothing left to revoke.
            Err(AuthError::Revoked | AuthError::Expired) => {}
            Err(e) => return Err(e.into()),
        }
    }
    tokens.revoke_claims(caller);
    info!(sub = %caller.sub, "logged out");
    Ok(LogoutResponse { success: true })
}

fn token_response(pair: TokenPair) -> TokenResponse {
    TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: (pair.access_expires_at - Utc::now().timestamp()).max(0),
        refresh_expires_at: pair.refresh_expires_at,
    }
}
