//! # portal_api
//!
//! HTTP API library for the portal backend: the authentication and
//! authorization chain every request passes through, and the thin routes
//! that exercise it.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::handler::HandlerWithoutStateExt;
use axum::routing::{get, post};
use portal_core::auth::jwt::TokenService;
use portal_core::models::Role;
use portal_core::rate_limit::SlidingWindowLimiter;
use tower::{Layer, ServiceBuilder};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{access, auth, fallback, health, webhooks};
use crate::middleware::chain::Chain;

/// Shared application state passed to all handlers and chain stages.
///
/// The token service (with its revocation set) and the rate limiter are the
/// only mutable shared state; both are built once here and shared by `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Token issuance, verification and revocation.
    pub tokens: Arc<TokenService>,
    /// Per-client sliding-window limiter.
    pub limiter: Arc<SlidingWindowLimiter>,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.tokens.clone());
        let limiter =
            SlidingWindowLimiter::new(config.rate_limit.max_requests, config.rate_limit.window);
        Self {
            config: Arc::new(config),
            tokens: Arc::new(tokens),
            limiter: Arc::new(limiter),
        }
    }
}

/// Builds the Axum router with all routes, their chains and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/auth/refresh", post(auth::refresh_handler))
        .layer(Chain::public(state.clone()));

    // Anonymous or authenticated
    let optional = Router::new()
        .route("/api/session", get(auth::session_handler))
        .layer(Chain::optional(state.clone()));

    // Protected routes (require auth)
    let protected = Router::new()
        .route("/api/auth/me", get(auth::me_handler))
        .route("/api/auth/logout", post(auth::logout_handler))
        .route(
            "/api/users/{user_id}/access",
            get(access::user_access_handler),
        )
        .layer(Chain::authenticated(state.clone()));

    let staff = Router::new()
        .route(
            "/api/berater/overview",
            get(access::berater_overview_handler),
        )
        .layer(Chain::authenticated(state.clone()).require_role(&[Role::Berater, Role::Admin]));

    let admin = Router::new()
        .route("/api/admin/stats", get(access::admin_stats_handler))
        .layer(Chain::authenticated(state.clone()).require_role(&[Role::Admin]));

    // Webhook callers (API key)
    let webhooks = Router::new()
        .route("/api/webhooks/{provider}", post(webhooks::webhook_handler))
        .layer(Chain::api_key(state.clone()));

    // Unmatched paths get a 404 instead of whichever group's chain axum picks.
    let not_found =
        Chain::public(state.clone()).layer(fallback::not_found_handler.into_service());

    let app = Router::new()
        .merge(public)
        .merge(optional)
        .merge(protected)
        .merge(staff)
        .merge(admin)
        .merge(webhooks)
        .fallback_service(not_found)
        .with_state(state);

    with_request_boundary(app)
}

/// Wrap `router` in the outer request boundary: request-id assignment and
/// propagation, tracing spans, and panic recovery.
pub fn with_request_boundary(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(axum::middleware::from_fn(middleware::boundary::recover)),
    )
}
