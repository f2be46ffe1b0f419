//! Webhook intake for API-key callers (payment provider, internal admin jobs).

use axum::Json;
use axum::body::Bytes;
use axum::extract::Path;
use tracing::info;

use crate::middleware::auth::ApiCaller;
use crate::models::WebhookAck;

/// `POST /api/webhooks/{provider}`: acknowledge a webhook delivery.
pub async fn webhook_handler(
    ApiCaller(caller): ApiCaller,
    Path(provider): Path<String>,
    body: Bytes,
) -> Json<WebhookAck> {
    info!(%caller, %provider, bytes = body.len(), "webhook received");
    Json(WebhookAck {
        received: true,
        provider,
        caller,
    })
}
