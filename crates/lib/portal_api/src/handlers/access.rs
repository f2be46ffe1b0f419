//! Role- and ownership-guarded endpoints.

use axum::Json;
use axum::extract::{Path, State};
use portal_core::auth::rbac::{self, STAFF_ROLES};

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AccessGrant, AccessResponse, AdminStatsResponse, Identity, OverviewResponse};

/// `GET /api/users/{user_id}/access`: owner, berater or admin only.
pub async fn user_access_handler(
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<AccessResponse>> {
    rbac::require_ownership_or_role(Some(&claims), &user_id, STAFF_ROLES)?;
    let granted_by = if claims.sub == user_id {
        AccessGrant::Owner
    } else {
        AccessGrant::Role
    };
    Ok(Json(AccessResponse {
        user_id,
        granted_by,
    }))
}

/// `GET /api/berater/overview`: berater or admin (enforced by the chain).
pub async fn berater_overview_handler(
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Json<OverviewResponse> {
    Json(OverviewResponse {
        is_admin: rbac::is_admin(&claims),
        viewer: Identity::from(&claims),
    })
}

/// `GET /api/admin/stats`: admin only (enforced by the chain).
pub async fn admin_stats_handler(State(state): State<AppState>) -> Json<AdminStatsResponse> {
    Json(AdminStatsResponse {
        revoked_tokens: state.tokens.revoked_count(),
        tracked_clients: state.limiter.tracked_clients(),
        rate_limit_max_requests: state.limiter.limit(),
        rate_limit_window_secs: state.limiter.window().as_secs(),
        api_key_callers: state.config.api_keys.registry.len(),
    })
}
