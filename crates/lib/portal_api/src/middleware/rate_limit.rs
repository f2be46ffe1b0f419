//! Rate-limit stage.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header::RETRY_AFTER};
use chrono::Utc;
use portal_core::auth::AuthError;
use portal_core::rate_limit::{RateDecision, SlidingWindowLimiter};
use tracing::debug;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Key used when the peer address is unavailable.
const UNKNOWN_CLIENT: &str = "unknown";

/// Admit or reject `request`, recording quota headers either way.
pub(crate) fn apply(
    limiter: &SlidingWindowLimiter,
    request: &Request,
    headers: &mut HeaderMap,
) -> Result<(), AuthError> {
    let client = client_key(request);
    let decision = limiter.check(&client);
    write_headers(&decision, headers);

    if decision.allowed {
        Ok(())
    } else {
        debug!(%client, reset_after = ?decision.reset_after, "rate limit exceeded");
        headers.insert(RETRY_AFTER, HeaderValue::from(ceil_secs(&decision)));
        Err(AuthError::RateLimitExceeded)
    }
}

/// Client network address.
fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn write_headers(decision: &RateDecision, headers: &mut HeaderMap) {
    let reset_at = Utc::now().timestamp() + ceil_secs(decision) as i64;
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(reset_at));
}

fn ceil_secs(decision: &RateDecision) -> u64 {
    decision.reset_after.as_secs_f64().ceil() as u64
}
