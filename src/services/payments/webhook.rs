// Stripe-Signature: t=<unix>,v1=<hex>, HMAC-SHA256 over "{t}.{raw body}"

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::ProcessorStatus;

pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Expired,
    #[error("no matching signature")]
    Mismatch,
}

pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = vec![];

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now_unix - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    for signature in &signatures {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        if mac.verify_slice(signature).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    pub object: Option<String>,
    pub status: Option<String>,
}

impl WebhookEvent {
    // payment_failed carries the intent's own status, so the booking stays pending
    pub fn intent_status(&self) -> Option<(&str, ProcessorStatus)> {
        if !self.event_type.starts_with("payment_intent.") {
            return None;
        }
        if self.data.object.object.as_deref().is_some_and(|o| o != "payment_intent") {
            return None;
        }

        let status = match self.event_type.as_str() {
            "payment_intent.succeeded" => ProcessorStatus::Succeeded,
            "payment_intent.canceled" => ProcessorStatus::Canceled,
            _ => ProcessorStatus::parse(self.data.object.status.as_deref()?),
        };
        Some((self.data.object.id.as_str(), status))
    }
}

#[cfg(test)]
pub(crate) fn sign_for_test(secret: &str, payload: &[u8], timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
