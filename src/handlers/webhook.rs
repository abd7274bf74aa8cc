use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::errors::AppError;
use crate::services::booking;
use crate::services::payments::webhook::{verify_signature, WebhookEvent};
use crate::state::AppState;

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn received() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "received": true }))).into_response()
}

// POST /webhook/stripe
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let secret = &state.config.stripe_webhook_secret;
    if secret.is_empty() {
        tracing::warn!("payment webhook called but STRIPE_WEBHOOK_SECRET is not set");
        return reject(StatusCode::SERVICE_UNAVAILABLE, "webhook not configured");
    }

    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        tracing::warn!("missing Stripe-Signature header");
        return reject(StatusCode::BAD_REQUEST, "missing signature");
    };

    if let Err(e) = verify_signature(secret, signature, &body, chrono::Utc::now().timestamp()) {
        tracing::warn!(error = %e, "invalid payment webhook signature");
        return reject(StatusCode::BAD_REQUEST, "invalid signature");
    }

    let event: WebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "unparseable payment webhook payload");
            return reject(StatusCode::BAD_REQUEST, "invalid payload");
        }
    };

    let Some((intent_id, status)) = event.intent_status() else {
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "ignoring payment event");
        return received();
    };

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        intent_id = %intent_id,
        "payment event received"
    );

    match booking::apply_processor_status(&state, intent_id, &status) {
        Ok(_) | Err(AppError::NotFound(_)) => received(),
        // Non-2xx makes the processor redeliver later.
        Err(e) => e.into_response(),
    }
}
