//! Authentication request handlers.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthenticatedUser, MaybeUser};
use crate::models::{
    Identity, LogoutRequest, LogoutResponse, RefreshRequest, SessionResponse, TokenResponse,
};
use crate::services::auth;

/// `POST /api/auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    let resp = auth::refresh(&state.tokens, &body.refresh_token)?;
    Ok(Json(resp))
}

/// `POST /api/auth/logout`: revoke the presented access token and, optionally,
/// a refresh token. The body may be empty.
pub async fn logout_handler(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: Bytes,
) -> AppResult<Json<LogoutResponse>> {
    let request: LogoutRequest = if body.is_empty() {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::Validation(e.to_string()))?
    };
    let resp = auth::logout(&state.tokens, &claims, request.refresh_token.as_deref())?;
    Ok(Json(resp))
}

/// `GET /api/auth/me`: the authenticated caller.
pub async fn me_handler(AuthenticatedUser(claims): AuthenticatedUser) -> Json<Identity> {
    Json(Identity::from(&claims))
}

/// `GET /api/session`: anonymous or authenticated view of the current session.
pub async fn session_handler(MaybeUser(claims): MaybeUser) -> Json<SessionResponse> {
    Json(SessionResponse {
        authenticated: claims.is_some(),
        user: claims.as_ref().map(Identity::from),
    })
}
