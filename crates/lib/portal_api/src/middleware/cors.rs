//! CORS stage.
//!
//! Denial is advisory: a disallowed origin simply gets no
//! `Access-Control-Allow-Origin` header and the request still proceeds.

use axum::extract::Request;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, ORIGIN, VARY,
};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use tracing::debug;

use super::chain::Flow;
use crate::config::CorsConfig;

const ANY_ORIGIN: &str = "*";

/// Add CORS headers for `request`; answer preflight requests with 204.
pub(crate) fn apply(policy: &CorsConfig, request: &Request, headers: &mut HeaderMap) -> Flow {
    if let Some(origin) = request.headers().get(ORIGIN) {
        headers.insert(VARY, HeaderValue::from_static("Origin"));
        match allowed_origin(policy, origin) {
            Some(allow) => {
                headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, allow);
                if policy.allow_credentials {
                    headers.insert(
                        ACCESS_CONTROL_ALLOW_CREDENTIALS,
                        HeaderValue::from_static("true"),
                    );
                }
            }
            None => debug!(origin = ?origin, "origin not allowed"),
        }
    }

    if request.method() != Method::OPTIONS {
        return Flow::Continue;
    }

    if let Ok(methods) = HeaderValue::from_str(&policy.allowed_methods.join(", ")) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, methods);
    }
    if let Ok(allowed) = HeaderValue::from_str(&policy.allowed_headers.join(", ")) {
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, allowed);
    }
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(policy.max_age_secs));
    Flow::Respond(StatusCode::NO_CONTENT.into_response())
}

/// Value for `Access-Control-Allow-Origin`, or `None` if `origin` is not allowed.
///
/// With credentials enabled a wildcard policy reflects the origin; the
/// literal `*` is only sent without credentials.
fn allowed_origin(policy: &CorsConfig, origin: &HeaderValue) -> Option<HeaderValue> {
    let origin_str = origin.to_str().ok()?;
    if policy.allowed_origins.iter().any(|o| o == origin_str) {
        return Some(origin.clone());
    }
    if policy.allowed_origins.iter().any(|o| o == ANY_ORIGIN) {
        return Some(if policy.allow_credentials {
            origin.clone()
        } else {
            HeaderValue::from_static(ANY_ORIGIN)
        });
    }
    None
}
