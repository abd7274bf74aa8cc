use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{is_well_formed_intent_id, CreatedIntent, GatewayError, PaymentGateway, ProcessorStatus};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub struct StripeGateway {
    secret_key: String,
    api_base: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    status: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(secret_key: String, api_base: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
        }
    }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.secret_key.is_empty() {
            return Err(GatewayError::Unavailable(
                "Stripe secret key not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<PaymentIntentResponse, (StatusCode, String)> {
        let resp = request
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| (StatusCode::SERVICE_UNAVAILABLE, format!("failed to reach Stripe: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| (StatusCode::BAD_GATEWAY, format!("failed to read Stripe response: {e}")))?;

        tracing::debug!(status = %status, "Stripe response");

        if status.is_success() {
            return serde_json::from_str(&body)
                .map_err(|e| (StatusCode::BAD_GATEWAY, format!("failed to parse Stripe response: {e}")));
        }

        let detail = serde_json::from_str::<StripeErrorBody>(&body)
            .map(|b| {
                let code = b.error.code.unwrap_or_else(|| "unknown".to_string());
                let message = b.error.message.unwrap_or_default();
                format!("{code}: {message}")
            })
            .unwrap_or_else(|_| body.clone());
        Err((status, detail))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::CONFLICT
}

fn create_intent_form(
    amount_minor: i64,
    currency: &str,
    metadata: &BTreeMap<String, String>,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), amount_minor.to_string()),
        ("currency".to_string(), currency.to_lowercase()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    for (key, value) in metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_intent(
        &self,
        amount_minor: i64,
        currency: &str,
        metadata: &BTreeMap<String, String>,
    ) -> Result<CreatedIntent, GatewayError> {
        self.ensure_configured()?;
        if amount_minor <= 0 {
            return Err(GatewayError::Rejected(
                "amount must be a positive number of minor units".to_string(),
            ));
        }

        let form = create_intent_form(amount_minor, currency, metadata);
        let request = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .form(&form);

        let intent = self.send(request).await.map_err(|(status, detail)| {
            if is_retryable(status) {
                GatewayError::Unavailable(format!("Stripe error ({status}): {detail}"))
            } else {
                GatewayError::Rejected(format!("Stripe error ({status}): {detail}"))
            }
        })?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            GatewayError::Unavailable("Stripe response missing client_secret".to_string())
        })?;

        tracing::info!(
            intent_id = %intent.id,
            amount = amount_minor,
            currency = %currency,
            "payment intent created"
        );

        Ok(CreatedIntent {
            intent_id: intent.id,
            client_secret,
        })
    }

    async fn get_intent_status(&self, intent_id: &str) -> Result<ProcessorStatus, GatewayError> {
        if !is_well_formed_intent_id(intent_id) {
            return Err(GatewayError::InvalidIntent(format!(
                "malformed payment intent id: {intent_id}"
            )));
        }
        self.ensure_configured()?;

        let request = self
            .client
            .get(format!("{}/v1/payment_intents/{intent_id}", self.api_base));

        let intent = self.send(request).await.map_err(|(status, detail)| {
            if is_retryable(status) {
                GatewayError::Unavailable(format!("Stripe error ({status}): {detail}"))
            } else {
                GatewayError::InvalidIntent(format!("Stripe error ({status}): {detail}"))
            }
        })?;

        Ok(ProcessorStatus::parse(&intent.status))
    }
}
