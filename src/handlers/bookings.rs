use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::json_body;
use crate::errors::AppError;
use crate::models::{BookingRequest, PricedService, ServiceSelection};
use crate::services::booking::{self, ConfirmedBooking, InitiatedBooking};
use crate::services::{pricing, roles};
use crate::state::AppState;

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<BookingRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<InitiatedBooking>), AppError> {
    let request = json_body(payload)?;
    let user_id = roles::optional_user_id(&state, &headers).await;

    let initiated = booking::initiate_booking(&state, request, user_id).await?;
    Ok((StatusCode::CREATED, Json(initiated)))
}

fn default_guests() -> i64 {
    1
}

// POST /api/bookings/quote
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    #[serde(flatten)]
    pub selection: ServiceSelection,
    #[serde(default = "default_guests")]
    pub guests: i64,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<PricedService>, AppError> {
    let request = json_body(payload)?;
    let priced = {
        let db = state.db()?;
        pricing::price_selection(&db, &request.selection, request.guests)?
    };
    Ok(Json(priced))
}

// POST /api/bookings/checkout
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub selection: ServiceSelection,
    #[serde(default = "default_guests")]
    pub guests: i64,
    #[serde(default)]
    pub booking_date: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub special_requirements: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    #[serde(flatten)]
    pub booking: InitiatedBooking,
    pub quote: PricedService,
}

/// Price the selection server-side, then run the normal booking flow
/// with the computed total.
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let request = json_body(payload)?;

    let quote = {
        let db = state.db()?;
        pricing::price_selection(&db, &request.selection, request.guests)?
    };

    let booking_request = BookingRequest {
        service_id: quote.service_id.clone(),
        service_name: quote.service_name.clone(),
        booking_date: request.booking_date,
        guests: request.guests,
        total_cost: quote.total_cost,
        customer_name: request.customer_name,
        customer_email: request.customer_email,
        customer_phone: request.customer_phone,
        special_requirements: request.special_requirements,
    };

    let user_id = roles::optional_user_id(&state, &headers).await;
    let initiated = booking::initiate_booking(&state, booking_request, user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            booking: initiated,
            quote,
        }),
    ))
}

// POST /api/bookings/confirm
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    #[serde(default)]
    pub payment_intent_id: String,
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<ConfirmedBooking>, AppError> {
    let request = json_body(payload)?;
    let confirmed = booking::confirm_booking(&state, &request.payment_intent_id).await?;
    Ok(Json(confirmed))
}
