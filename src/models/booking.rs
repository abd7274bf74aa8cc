use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub service_id: String,
    /// Display name captured when the booking was made. Never rewritten.
    pub service_name: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub booking_date: NaiveDate,
    pub guests: i64,
    pub total_cost: Decimal,
    pub special_requirements: Option<String>,
    pub payment_intent_id: Option<String>,
    pub status: BookingStatus,
    pub user_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

fn default_guests() -> i64 {
    1
}

/// Booking details as submitted by the booking wizard.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub booking_date: String,
    #[serde(default = "default_guests")]
    pub guests: i64,
    #[serde(default)]
    pub total_cost: Decimal,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub special_requirements: Option<String>,
}

/// A booking request that passed validation; blank optionals are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub service_id: String,
    pub service_name: String,
    pub booking_date: NaiveDate,
    pub guests: i64,
    pub total_cost: Decimal,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub special_requirements: Option<String>,
}

impl BookingRequest {
    pub fn validate(self) -> Result<NewBooking, String> {
        let service_id = required(&self.service_id, "serviceId")?;
        let customer_name = required(&self.customer_name, "customerName")?;
        let customer_email = required(&self.customer_email, "customerEmail")?;
        let booking_date = required(&self.booking_date, "bookingDate")?;

        if !is_plausible_email(&customer_email) {
            return Err("customerEmail is not a valid email address".to_string());
        }

        let booking_date = NaiveDate::parse_from_str(&booking_date, "%Y-%m-%d")
            .map_err(|_| "bookingDate must be a date in YYYY-MM-DD format".to_string())?;

        if self.guests < 1 {
            return Err("guests must be at least 1".to_string());
        }
        if self.total_cost < Decimal::ZERO {
            return Err("totalCost must not be negative".to_string());
        }

        // Fall back to the id so the snapshot is never empty.
        let service_name = match self.service_name.trim() {
            "" => service_id.clone(),
            name => name.to_string(),
        };

        Ok(NewBooking {
            service_id,
            service_name,
            booking_date,
            guests: self.guests,
            total_cost: self.total_cost,
            customer_name,
            customer_email,
            customer_phone: optional(self.customer_phone),
            special_requirements: optional(self.special_requirements),
        })
    }
}

impl NewBooking {
    /// Metadata attached to the payment intent, enough to rebuild the
    /// booking context without reading the store.
    pub fn intent_metadata(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("service_id".to_string(), self.service_id.clone()),
            ("service_name".to_string(), self.service_name.clone()),
            ("guests".to_string(), self.guests.to_string()),
            ("booking_date".to_string(), self.booking_date.to_string()),
            ("customer_name".to_string(), self.customer_name.clone()),
            ("customer_email".to_string(), self.customer_email.clone()),
        ])
    }

    pub fn into_booking(self, payment_intent_id: String, user_id: Option<String>) -> Booking {
        let now = Utc::now().naive_utc();
        Booking {
            id: uuid::Uuid::new_v4().to_string(),
            service_id: self.service_id,
            service_name: self.service_name,
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            booking_date: self.booking_date,
            guests: self.guests,
            total_cost: self.total_cost,
            special_requirements: self.special_requirements,
            payment_intent_id: Some(payment_intent_id),
            status: BookingStatus::Pending,
            user_id,
            created_at: now,
            updated_at: now,
        }
    }
}

fn required(value: &str, field: &str) -> Result<String, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !email.contains(' '),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gorilla_request() -> BookingRequest {
        BookingRequest {
            service_id: "gorilla-trekking".to_string(),
            service_name: "Mountain Gorilla Trekking".to_string(),
            booking_date: "2024-09-07".to_string(),
            guests: 2,
            total_cost: Decimal::new(3000, 0),
            customer_name: "Jane Doe".to_string(),
            customer_email: "jane@example.com".to_string(),
            customer_phone: Some("   ".to_string()),
            special_requirements: None,
        }
    }

    #[test]
    fn test_validate_accepts_complete_request() {
        let booking = gorilla_request().validate().unwrap();
        assert_eq!(booking.service_id, "gorilla-trekking");
        assert_eq!(booking.booking_date, NaiveDate::from_ymd_opt(2024, 9, 7).unwrap());
        assert_eq!(booking.customer_phone, None);
    }

    #[test]
    fn test_validate_rejects_missing_fields() {
        let mut req = gorilla_request();
        req.service_id = String::new();
        assert!(req.validate().unwrap_err().contains("serviceId"));

        let mut req = gorilla_request();
        req.customer_email = "  ".to_string();
        assert!(req.validate().unwrap_err().contains("customerEmail"));

        let mut req = gorilla_request();
        req.booking_date = String::new();
        assert!(req.validate().unwrap_err().contains("bookingDate"));

        let mut req = gorilla_request();
        req.customer_name = String::new();
        assert!(req.validate().unwrap_err().contains("customerName"));
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        let mut req = gorilla_request();
        req.guests = 0;
        assert!(req.validate().is_err());

        let mut req = gorilla_request();
        req.total_cost = Decimal::new(-1, 2);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_date_and_email() {
        let mut req = gorilla_request();
        req.booking_date = "07/09/2024".to_string();
        assert!(req.validate().is_err());

        let mut req = gorilla_request();
        req.customer_email = "jane.example.com".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_service_name_falls_back_to_id() {
        let mut req = gorilla_request();
        req.service_name = String::new();
        assert_eq!(req.validate().unwrap().service_name, "gorilla-trekking");
    }

    #[test]
    fn test_intent_metadata_mirrors_booking() {
        let metadata = gorilla_request().validate().unwrap().intent_metadata();
        assert_eq!(metadata["service_id"], "gorilla-trekking");
        assert_eq!(metadata["service_name"], "Mountain Gorilla Trekking");
        assert_eq!(metadata["guests"], "2");
        assert_eq!(metadata["booking_date"], "2024-09-07");
        assert_eq!(metadata["customer_name"], "Jane Doe");
        assert_eq!(metadata["customer_email"], "jane@example.com");
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(BookingStatus::parse("confirmed"), Some(BookingStatus::Confirmed));
        assert_eq!(BookingStatus::parse("refunded"), None);
    }
}
