use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, BookingRequest, BookingStatus};
use crate::services::payments::{is_well_formed_intent_id, to_minor_units, ProcessorStatus};
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedBooking {
    pub booking_id: String,
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedBooking {
    pub booking: Booking,
    pub payment_status: String,
}

pub fn booking_status_for(status: &ProcessorStatus) -> Option<BookingStatus> {
    match status {
        ProcessorStatus::Succeeded => Some(BookingStatus::Confirmed),
        ProcessorStatus::Canceled => Some(BookingStatus::Cancelled),
        _ => None,
    }
}

pub async fn initiate_booking(
    state: &AppState,
    request: BookingRequest,
    user_id: Option<String>,
) -> Result<InitiatedBooking, AppError> {
    let new_booking = request.validate().map_err(AppError::InvalidRequest)?;

    let amount_minor = to_minor_units(new_booking.total_cost)
        .ok_or_else(|| AppError::InvalidRequest("totalCost is too large".to_string()))?;
    if amount_minor == 0 {
        return Err(AppError::InvalidRequest(
            "totalCost must be greater than zero to take a payment".to_string(),
        ));
    }

    let metadata = new_booking.intent_metadata();
    let intent = state
        .payments
        .create_intent(amount_minor, &state.config.currency, &metadata)
        .await
        .map_err(|e| {
            tracing::warn!(
                error = %e,
                service_id = %new_booking.service_id,
                "payment intent creation failed, no booking written"
            );
            AppError::from(e)
        })?;

    let booking = new_booking.into_booking(intent.intent_id.clone(), user_id);

    let written = state
        .db()
        .and_then(|db| queries::create_booking(&db, &booking));
    if let Err(e) = written {
        tracing::error!(
            error = %e,
            intent_id = %intent.intent_id,
            booking_id = %booking.id,
            amount = amount_minor,
            "booking write failed after payment intent creation, intent needs reconciliation"
        );
        return Err(AppError::PartialFailure {
            intent_id: intent.intent_id,
        });
    }

    tracing::info!(
        booking_id = %booking.id,
        intent_id = %intent.intent_id,
        service_id = %booking.service_id,
        amount = amount_minor,
        "booking created"
    );

    Ok(InitiatedBooking {
        booking_id: booking.id,
        client_secret: intent.client_secret,
        payment_intent_id: intent.intent_id,
    })
}

pub async fn confirm_booking(state: &AppState, intent_id: &str) -> Result<ConfirmedBooking, AppError> {
    let intent_id = intent_id.trim();
    if intent_id.is_empty() {
        return Err(AppError::InvalidRequest("paymentIntentId is required".to_string()));
    }
    if !is_well_formed_intent_id(intent_id) {
        return Err(AppError::InvalidIntent("malformed payment intent id".to_string()));
    }

    let existing = {
        let db = state.db()?;
        queries::get_booking_by_intent(&db, intent_id)?
    };
    let Some(existing) = existing else {
        tracing::info!(intent_id = %intent_id, "confirmation for unknown payment intent");
        return Err(AppError::NotFound("booking for payment intent".to_string()));
    };

    let processor_status = state
        .payments
        .get_intent_status(intent_id)
        .await
        .map_err(|e| {
            tracing::warn!(
                error = %e,
                intent_id = %intent_id,
                booking_id = %existing.id,
                "payment status lookup failed, booking status unchanged"
            );
            AppError::from(e)
        })?;

    let booking = apply_processor_status(state, intent_id, &processor_status)?;

    Ok(ConfirmedBooking {
        booking,
        payment_status: processor_status.as_str().to_string(),
    })
}

/// Shared by the confirm endpoint and the webhook.
pub fn apply_processor_status(
    state: &AppState,
    intent_id: &str,
    processor_status: &ProcessorStatus,
) -> Result<Booking, AppError> {
    let db = state.db()?;

    if let Some(target) = booking_status_for(processor_status) {
        let updated = queries::update_status_by_intent(&db, intent_id, target)?;
        if updated {
            tracing::info!(
                intent_id = %intent_id,
                status = target.as_str(),
                processor_status = processor_status.as_str(),
                "booking status updated from payment"
            );
        }
    } else {
        tracing::debug!(
            intent_id = %intent_id,
            processor_status = processor_status.as_str(),
            "payment not settled, booking status unchanged"
        );
    }

    queries::get_booking_by_intent(&db, intent_id)?.ok_or_else(|| {
        tracing::info!(intent_id = %intent_id, "payment event for unknown payment intent");
        AppError::NotFound("booking for payment intent".to_string())
    })
}
