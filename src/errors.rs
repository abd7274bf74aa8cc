use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::payments::GatewayError;

const SUPPORT_MESSAGE: &str =
    "We could not complete your booking. Please contact support before trying again.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("payment processor unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("invalid payment intent: {0}")]
    InvalidIntent(String),

    /// The payment intent exists but the booking row could not be written.
    #[error("booking could not be recorded for payment intent {intent_id}")]
    PartialFailure { intent_id: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("identity provider error: {0}")]
    Identity(String),

    #[error("{0}")]
    Assistant(String),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Store(e.into())
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(msg) => AppError::GatewayUnavailable(msg),
            GatewayError::InvalidIntent(msg) => AppError::InvalidIntent(msg),
            GatewayError::Rejected(msg) => {
                AppError::InvalidRequest(format!("payment processor rejected the request: {msg}"))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidIntent(_) => StatusCode::BAD_REQUEST,
            AppError::PartialFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Identity(_) => StatusCode::BAD_GATEWAY,
            AppError::Assistant(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Orphaned intents and store failures never leak internals to the caller.
        let message = match &self {
            AppError::PartialFailure { .. } => SUPPORT_MESSAGE.to_string(),
            AppError::Store(e) => {
                tracing::error!(error = %e, "store error");
                "internal error".to_string()
            }
            other => other.to_string(),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}
