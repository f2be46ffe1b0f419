//! Outermost request boundary: panic recovery and request-id stamping.
//!
//! Routes behind a [`Chain`](super::chain::Chain) recover their own panics so
//! the chain's headers survive; this boundary covers everything else.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use axum::body::Body;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::http::header::CONTENT_LENGTH;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use tracing::error;

use crate::error::{AppError, ErrorBody};

/// Header carrying the per-request identifier.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Axum middleware: converts handler panics into a 500 envelope and stamps
/// the request id onto every error envelope.
pub async fn recover(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            error!(
                request_id = request_id.as_deref().unwrap_or("-"),
                panic = panic_message(panic.as_ref()),
                "handler panicked"
            );
            AppError::Internal("handler panicked".into()).into_response()
        }
    };

    match request_id {
        Some(id) => stamp_request_id(response, id),
        None => response,
    }
}

fn stamp_request_id(response: Response, request_id: String) -> Response {
    let Some(mut body) = response.extensions().get::<ErrorBody>().cloned() else {
        return response;
    };
    body.request_id = Some(request_id);
    let Ok(bytes) = serde_json::to_vec(&body) else {
        return response;
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
    parts.extensions.insert(body);
    Response::from_parts(parts, Body::from(bytes))
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
