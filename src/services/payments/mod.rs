pub mod stripe;
pub mod webhook;

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessorStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    Other(String),
}

impl ProcessorStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "requires_payment_method" => ProcessorStatus::RequiresPaymentMethod,
            "requires_confirmation" => ProcessorStatus::RequiresConfirmation,
            "requires_action" => ProcessorStatus::RequiresAction,
            "processing" => ProcessorStatus::Processing,
            "requires_capture" => ProcessorStatus::RequiresCapture,
            "canceled" => ProcessorStatus::Canceled,
            "succeeded" => ProcessorStatus::Succeeded,
            other => ProcessorStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProcessorStatus::RequiresPaymentMethod => "requires_payment_method",
            ProcessorStatus::RequiresConfirmation => "requires_confirmation",
            ProcessorStatus::RequiresAction => "requires_action",
            ProcessorStatus::Processing => "processing",
            ProcessorStatus::RequiresCapture => "requires_capture",
            ProcessorStatus::Canceled => "canceled",
            ProcessorStatus::Succeeded => "succeeded",
            ProcessorStatus::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedIntent {
    pub intent_id: String,
    pub client_secret: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // retryable
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    InvalidIntent(String),

    #[error("{0}")]
    Rejected(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// `amount_minor` is already in the currency's smallest unit.
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<CreatedIntent, GatewayError>;

    async fn get_intent_status(&self, intent_id: &str) -> Result<ProcessorStatus, GatewayError>;
}

/// Cents, rounded half away from zero. `None` on overflow.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

// Checked before the id is put into a URL path.
pub fn is_well_formed_intent_id(intent_id: &str) -> bool {
    intent_id.len() > 3
        && intent_id.len() <= 255
        && intent_id.starts_with("pi_")
        && intent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
