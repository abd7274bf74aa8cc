pub mod admin;
pub mod auth;
pub mod bookings;
pub mod catalog;
pub mod guide;
pub mod health;
pub mod webhook;

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::errors::AppError;

/// Unwrap a JSON body, turning a bad payload into `InvalidRequest`
/// instead of axum's plain-text rejection.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))
}
